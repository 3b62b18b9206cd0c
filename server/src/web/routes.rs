// ormlab/server/src/web/routes.rs

use actix_web::web;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::lab_handlers;

// Healthy means the pool can still hand out a working connection.
async fn health_check_handler(app_state: web::Data<AppState>) -> Result<actix_web::HttpResponse, AppError> {
  sqlx::query("SELECT 1").execute(&app_state.db_pool).await?;
  Ok(actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

// Called from `main.rs` (and the route tests) to mount every service on the App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.route("/health", web::get().to(health_check_handler)).service(
    web::scope("/api/lab")
      .route("/nplus1", web::get().to(lab_handlers::n_plus_one_handler))
      .route("/dirty-checking", web::get().to(lab_handlers::dirty_checking_handler))
      .route("/lazy-exception", web::get().to(lab_handlers::lazy_exception_handler))
      .route("/lazy-correct", web::get().to(lab_handlers::lazy_correct_handler))
      .route(
        "/cartesian-explosion",
        web::get().to(lab_handlers::cartesian_explosion_handler),
      )
      .route("/join-vs-fetch", web::get().to(lab_handlers::join_vs_fetch_handler))
      .route("/dto-projection", web::get().to(lab_handlers::dto_projection_handler)),
  );
}

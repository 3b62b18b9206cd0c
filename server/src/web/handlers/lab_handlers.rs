// ormlab/server/src/web/handlers/lab_handlers.rs

//! One handler per lab demo. Each runs a single `LabService` operation and
//! reports how many SQL statements it took in the `X-Query-Count` header.

use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};
use ormlab::Measured;
use serde::Serialize;
use std::fmt::Display;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

pub const QUERY_COUNT_HEADER: &str = "X-Query-Count";

fn json_response<T: Serialize>(measured: Measured<T>) -> HttpResponse {
  HttpResponse::Ok()
    .insert_header((QUERY_COUNT_HEADER, measured.statements.to_string()))
    .json(&measured.value)
}

fn text_response<T: Display>(measured: Measured<T>) -> HttpResponse {
  HttpResponse::Ok()
    .insert_header((QUERY_COUNT_HEADER, measured.statements.to_string()))
    .content_type(ContentType::plaintext())
    .body(measured.value.to_string())
}

#[instrument(name = "handler::nplus1", skip(app_state))]
pub async fn n_plus_one_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let measured = app_state.lab.n_plus_one().await?;
  info!(
    orders = measured.value.len(),
    statements = measured.statements,
    "Served all orders with owners resolved one by one."
  );
  Ok(json_response(measured))
}

#[instrument(name = "handler::dirty_checking", skip(app_state))]
pub async fn dirty_checking_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let measured = app_state.lab.dirty_checking().await?;
  Ok(text_response(measured))
}

#[instrument(name = "handler::lazy_exception", skip(app_state))]
pub async fn lazy_exception_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  // The detached-access failure is part of the answer, not an error response.
  let measured = app_state.lab.lazy_exception().await?;
  Ok(text_response(measured))
}

#[instrument(name = "handler::lazy_correct", skip(app_state))]
pub async fn lazy_correct_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let measured = app_state.lab.lazy_correct().await?;
  Ok(text_response(measured))
}

#[instrument(name = "handler::cartesian_explosion", skip(app_state))]
pub async fn cartesian_explosion_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let measured = app_state.lab.cartesian_explosion().await?;
  Ok(text_response(measured))
}

#[instrument(name = "handler::join_vs_fetch", skip(app_state))]
pub async fn join_vs_fetch_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let measured = app_state.lab.join_vs_fetch().await?;
  Ok(text_response(measured))
}

#[instrument(name = "handler::dto_projection", skip(app_state))]
pub async fn dto_projection_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let measured = app_state.lab.dto_projection().await?;
  Ok(json_response(measured))
}

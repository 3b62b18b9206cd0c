// ormlab/core/src/model/mod.rs

//! Entities and projections mapped onto the lab schema.

pub mod order;
pub mod product;
pub mod projection;
pub mod related;
pub mod user;

pub use order::{Order, OrderState, STATUS_COMPLETED, STATUS_PENDING, STATUS_UPDATED_WITHOUT_SAVE};
pub use product::{Product, ProductState};
pub use projection::UserOrderCount;
pub use related::{DeferredLink, Related};
pub use user::{User, UserState};

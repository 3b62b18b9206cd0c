// ormlab/server/src/web/handlers/mod.rs

// Declare handler modules
pub mod lab_handlers;

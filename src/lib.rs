// src/lib.rs

pub mod assessment;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod remote;
pub mod routes;
pub mod scheduling;
pub mod session;
pub mod state;
pub mod utils;

pub use routes::create_router;

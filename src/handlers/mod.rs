// src/handlers/mod.rs

pub mod assessment;
pub mod interview;
pub mod session;

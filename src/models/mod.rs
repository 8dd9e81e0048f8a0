// src/models/mod.rs

pub mod assessment;
pub mod interview;
pub mod profile;

// src/handlers/mod.rs

pub mod bank;
pub mod marks;
pub mod review;
pub mod session;

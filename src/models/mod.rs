// src/models/mod.rs

pub mod bank;
pub mod mistake;
pub mod question;
pub mod review;
pub mod session;

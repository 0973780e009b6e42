// src/engine/mod.rs

pub mod category;
pub mod drill;
pub mod full_sim;
pub mod generator;
pub mod lifecycle;
pub mod pacing;
pub mod resolve;
pub mod rng;
pub mod scoring;
pub mod selection;
pub mod spaced;
pub mod timer;

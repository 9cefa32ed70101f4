//! API handlers

pub mod graph;
pub mod health;

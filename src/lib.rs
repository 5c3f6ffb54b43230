//! Indoor air quality decision engine.
//!
//! Scores pollutant readings, forecasts threshold crossings and selects
//! corrective actions from the actuators a room actually has. The `api`
//! module exposes the engine over HTTP.

pub mod actuator;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod history;
pub mod priority;
pub mod scoring;
pub mod state;

//! HTTP server for daily tournament leaderboards.
//!
//! Wraps the `leaderboard` engine with an axum API, environment-driven
//! configuration, structured logging, Prometheus metrics, and the daily
//! closer that finishes each day's tournaments.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod scheduler;

//! # MRI Qube Sync Library
//!
//! Core functionality for the MRI Qube sync service: the authenticated API
//! client with its rate-limited request pipeline, and the sync orchestration
//! that mirrors remote Qube entities into local tables.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod repositories;
pub mod resources;
pub mod scheduler;
pub mod sync;
pub mod telemetry;
pub mod token;
pub use migration;

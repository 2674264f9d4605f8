//! Internship application tracking: an owner-scoped lifecycle engine, a query engine with
//! two-phase projected listings and status statistics, and the HTTP gateway in front of them.

pub mod applications;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod telemetry;

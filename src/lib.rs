//! Appointment board service: status workflow, day time grid and filtered
//! appointment views over a clinic's appointment backend.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduling;
pub mod source;

// src/scheduling/mod.rs
//
// Pure appointment-board logic. Nothing in here touches the network or the
// database: every function takes an already-fetched snapshot and derives a view.

pub mod appointment;
pub mod filtering;
pub mod status;
pub mod time_grid;

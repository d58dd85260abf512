//! Effort estimation for payroll defect reports.
//!
//! Estimates come from robust statistics over historical resolution times,
//! adjusted by deterministic keyword rules. See [`estimation`] for the engines.

pub mod cli;
pub mod config;
pub mod error;
pub mod estimation;
pub mod server;

//! Graduation credit audit.
//!
//! Aggregates course credits through a training program's category tree,
//! computes the credit-weighted GPA, and serves the result over HTTP.

pub mod audit;
pub mod config;
pub mod db;
pub mod server;
pub mod types;

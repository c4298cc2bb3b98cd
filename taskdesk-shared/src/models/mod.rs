//! Persisted models and their document operations
//!
//! - `user`: Registered accounts
//! - `task`: Personal task records

pub mod task;
pub mod user;

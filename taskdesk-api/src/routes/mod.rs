//! API route handlers
//!
//! This module contains all route handlers organized by resource:
//!
//! - `health`: Health check endpoint
//! - `auth`: Registration and login
//! - `tasks`: Task CRUD for the authenticated user

pub mod auth;
pub mod health;
pub mod tasks;

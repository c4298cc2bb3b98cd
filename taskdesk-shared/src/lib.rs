//! # Taskdesk Shared Library
//!
//! Storage, authentication, and task logic used by the Taskdesk API server.
//!
//! ## Module Organization
//!
//! - `store`: The single JSON document holding all users and tasks
//! - `models`: Users and tasks, with their document operations
//! - `auth`: Password hashing, bearer tokens, and the request auth gate
//! - `attachment`: Moving uploaded files into per-user storage

pub mod attachment;
pub mod auth;
pub mod models;
pub mod store;


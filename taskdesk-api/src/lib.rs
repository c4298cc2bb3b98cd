//! # Taskdesk API Server Library
//!
//! HTTP surface of Taskdesk: registration, login, and personal task CRUD
//! with optional file attachments.
//!
//! ## Modules
//!
//! - `app`: Application state, auth extractor, and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

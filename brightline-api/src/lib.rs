//! # Brightline API Server Library
//!
//! This library provides the HTTP layer of the Brightline marketing site
//! backend: content CRUD, form intake and file uploads.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors (validated JSON, client IP, includes)
//! - `middleware`: Authentication layers
//! - `presentation`: Response envelopes and entity views
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod presentation;
pub mod routes;

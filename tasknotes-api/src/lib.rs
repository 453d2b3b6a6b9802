//! # TaskNotes API Server Library
//!
//! HTTP surface of the task-and-notes backend.
//!
//! ## Modules
//!
//! - `app`: Application state, router and auth layer
//! - `config`: Configuration from the environment
//! - `dto`: Request and response bodies
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors with JSON rejections
//! - `middleware`: Security headers
//! - `notifications`: Notification hub and reminder job
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notifications;
pub mod routes;

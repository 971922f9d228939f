//! Blog use-case handlers.
//!
//! # Responsibility
//! - Orchestrate repository calls into the five blog RPC handlers.
//! - Keep transport layers decoupled from storage details.

pub mod blog_service;

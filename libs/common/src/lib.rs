//! Common library for the Academy platform
//!
//! This crate provides shared infrastructure used across the Academy
//! services: PostgreSQL connection pooling, Redis connectivity, and the
//! error types both of them surface.

pub mod cache;
pub mod database;
pub mod error;

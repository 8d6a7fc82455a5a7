//! Boundary services.
//!
//! # Responsibility
//! - Orchestrate access, lifecycle, aggregation and dispatch into the
//!   operations the request-handling boundary calls.
//! - Keep every failure a tagged value; nothing here throws an
//!   unstructured error.

pub mod records_service;

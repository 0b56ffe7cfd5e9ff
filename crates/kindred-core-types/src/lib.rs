//! Core types shared across kindred facilities
//!
//! This crate provides the canonical vocabulary used by both the error
//! and logging facilities:
//!
//! - **Schema constants**: Canonical field keys and event names

pub mod schema;

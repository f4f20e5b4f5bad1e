//! Test fixtures for tour-planner.
//!
//! Provides stub crowd models and catalog helpers shared across the
//! integration tests.

pub mod stub_models;

#[allow(unused_imports)]
pub use stub_models::*;

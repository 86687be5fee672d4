pub mod config;
pub mod yaml_include;

/// Common utilities shared across the typology processor workspace
///
/// This crate provides shared functionality that can be used by the
/// processing crate and its executables, including:
///
/// - Configuration loading with `!include` support
/// - Shared test utilities

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_id, init_test_tracing};

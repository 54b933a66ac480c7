//! Common test utilities and infrastructure
//!
//! Shared fixtures and builders used across the supervisor test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{RecordingLauncher, SupervisorBuilder, TestHelpers};

//! Test Module
//!
//! Cross-module test suites for the support engine.
//!
//! ## Test Categories
//! - `brain_tests`: Classification, tie-breaking, catalog files, estimators, selection
//! - `session_tests`: Log caps, crisis latching and reset through the orchestrator
//! - `supervisor_tests`: Actor requests, unknown sessions, shutdown
//! - `integration_tests`: Full conversations including trend overrides

pub mod integration_tests;
pub mod session_tests;

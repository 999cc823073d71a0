//! Staleness-gated build steps and instrumentation test output parsing.
//!
//! [`stamp`] decides whether an expensive build action must rerun by
//! fingerprinting its inputs; [`instrumentation`] decodes the status stream an
//! instrumented Android test run prints. The remaining modules are thin
//! callers used by the `bharness` binary.
pub mod gtest;
pub mod instrumentation;
pub mod stamp;
pub mod steps;

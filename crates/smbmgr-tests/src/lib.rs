//! SmbMgr integration and property tests.
//!
//! Exercises the reconciliation core end to end: apply batches against
//! in-memory stores, inspect the derived public/private artifacts, and
//! check orchestrator interactions through the recording stubs.

pub mod common;
pub mod handler_integration;
pub mod matcher_props;

pub use common::{TestHarness, init_logging};

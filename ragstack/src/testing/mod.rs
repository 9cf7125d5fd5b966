//! Testing utilities for ragstack deployments.
//!
//! This module provides:
//! - Fixtures for deployment contexts and config files
//! - Mock provisioners and backends
//! - Assertions over plans and errors

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{assert_missing_output, assert_plan_order, assert_plan_respects};
pub use fixtures::{sample_config_json, sample_context, TEST_ACCOUNT_ID, TEST_REGION};
pub use mocks::{FailingBackend, RecordingBackend, StaticProvisioner};

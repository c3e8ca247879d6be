//! Infrastructure layer: stores, configuration and the provisioning orchestrator.

pub mod config;
pub mod provisioning;
pub mod store;

mod integration_tests;

pub use config::ProvisioningConfig;
pub use provisioning::{
    ErrorKind, ProvisioningError, ProvisioningFailure, ProvisioningOutcome, ProvisioningStores,
    ProvisioningWarning, TenantProvisioner,
};

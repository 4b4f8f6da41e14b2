//! Azure DevOps provider: resource adapters, the ACL and policy engines
//! and the provider registry, built on the `declarative` lifecycle kernel
//! and the `azdo-api` client facade.

pub mod client;
pub mod config;
pub mod converter;
pub mod data_sources;
pub mod permissions;
pub mod policy;
pub mod provider;
pub mod resources;
pub mod security;

#[cfg(test)]
mod testutil;

pub use provider::{AzureDevOpsProvider, PROVIDER_TYPE};

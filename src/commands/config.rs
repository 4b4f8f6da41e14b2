use anyhow::{Context as _, Result};
use azdo_provider::config::{EnvLookup, ProviderConfig, process_env};
use log::info;
use std::path::Path;

use crate::Context;

/// Resolve the provider block from a file and the environment, then print
/// a redacted summary and the credential it selects.
pub fn run(_ctx: &Context, file: Option<&Path>) -> Result<()> {
    let block = match file {
        Some(path) => {
            info!("Loading provider config from {}", path.display());
            ProviderConfig::load(path)?
        }
        None => ProviderConfig::default(),
    };
    println!("{}", summary(block, &process_env)?);
    Ok(())
}

fn summary(block: ProviderConfig, env: EnvLookup<'_>) -> Result<String> {
    let block = block.resolve(env);
    block.validate().context("Provider configuration is invalid")?;
    let credential = match block.aad_chain() {
        chain if chain.sources.is_empty() => "personal access token".to_string(),
        chain => format!("Azure AD token from {chain}"),
    };
    Ok(format!("{block}\ncredential: {credential}"))
}

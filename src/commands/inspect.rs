use anyhow::{Result, bail};
use azdo_provider::AzureDevOpsProvider;
use declarative::Provider;
use log::debug;
use serde_json::{Value, json};

use crate::Context;

fn provider() -> AzureDevOpsProvider {
    AzureDevOpsProvider::new(env!("CARGO_PKG_VERSION"))
}

/// One line per resource and data source: kind, type name, schema version.
pub fn resources(ctx: &Context) -> Result<()> {
    if !ctx.quiet {
        println!("{} provider {}", azdo_provider::PROVIDER_TYPE, env!("CARGO_PKG_VERSION"));
    }
    for line in registry_lines(&provider()) {
        println!("{line}");
    }
    Ok(())
}

fn registry_lines(provider: &dyn Provider) -> Vec<String> {
    let mut lines: Vec<String> = provider
        .resources()
        .iter()
        .map(|r| format!("resource     {:<48} v{}", r.resource_type(), r.schema().version))
        .collect();
    lines.extend(
        provider
            .data_sources()
            .iter()
            .map(|d| format!("data source  {:<48} v{}", d.data_source_type(), d.schema().version)),
    );
    lines
}

/// Print the JSON schema of one type, or every type when none is given.
pub fn schema(ctx: &Context, type_name: Option<&str>) -> Result<()> {
    let document = schema_document(&provider(), type_name)?;
    debug!("verbose={} rendering schema for {}", ctx.verbose, type_name.unwrap_or("all types"));
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn schema_document(provider: &dyn Provider, type_name: Option<&str>) -> Result<Value> {
    let mut resources = serde_json::Map::new();
    for resource in provider.resources() {
        if type_name.is_some_and(|name| name != resource.resource_type()) {
            continue;
        }
        resources.insert(
            resource.resource_type().to_string(),
            json!({
                "schema": resource.schema(),
                "identity": resource.identity_schema(),
            }),
        );
    }
    let mut data_sources = serde_json::Map::new();
    for source in provider.data_sources() {
        if type_name.is_some_and(|name| name != source.data_source_type()) {
            continue;
        }
        data_sources.insert(source.data_source_type().to_string(), json!({"schema": source.schema()}));
    }

    if let Some(name) = type_name {
        if resources.is_empty() && data_sources.is_empty() {
            bail!("Unknown resource or data source type: {name}");
        }
    }
    Ok(json!({
        "provider": {
            "type": provider.type_name(),
            "version": provider.version(),
            "schema": provider.schema(),
        },
        "resources": resources,
        "data_sources": data_sources,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lines_cover_resources_and_data_sources() {
        let lines = registry_lines(&provider());
        assert!(lines.iter().any(|l| l.starts_with("resource") && l.contains("azuredevops_project ")));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("data source") && l.contains("azuredevops_security_namespace_token"))
        );
    }

    #[test]
    fn test_schema_of_one_type_carries_timeouts_and_identity() {
        let document = schema_document(&provider(), Some("azuredevops_group_membership")).unwrap();
        let resources = document["resources"].as_object().unwrap();
        assert_eq!(resources.len(), 1);
        let membership = &resources["azuredevops_group_membership"];
        assert!(membership["schema"]["attributes"].get("timeouts").is_some());
        assert!(!membership["identity"]["attributes"].as_array().unwrap().is_empty());
        assert_eq!(document["provider"]["type"], "azuredevops");
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let err = schema_document(&provider(), Some("azuredevops_nope")).unwrap_err();
        assert!(err.to_string().contains("azuredevops_nope"));
    }
}

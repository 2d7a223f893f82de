//! Semantic validation for parsed project configuration values.

use anyhow::{bail, Result};

use crate::config::types::{EndpointConfig, ProjectConfig};

fn validate_endpoint(endpoint: &EndpointConfig, context: &str, errors: &mut Vec<String>) {
    if endpoint.api_url.trim().is_empty() {
        errors.push(format!("{context}: api_url must not be empty"));
    } else if !endpoint.api_url.starts_with("http://") && !endpoint.api_url.starts_with("https://")
    {
        errors.push(format!(
            "{context}: api_url '{}' must be an http(s) URL",
            endpoint.api_url
        ));
    }
    if endpoint.auth_token.trim().is_empty() {
        errors.push(format!("{context}: auth_token must not be empty"));
    }
    if endpoint.request_timeout_secs == 0 {
        errors.push(format!("{context}: request_timeout_secs must be > 0"));
    }
}

/// Validate a parsed project configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the project
/// config.
pub fn validate_project(config: &ProjectConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported config version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.project.trim().is_empty() {
        errors.push("Project name must not be empty".to_string());
    }

    validate_endpoint(&config.source, "source", &mut errors);
    validate_endpoint(&config.target, "target", &mut errors);

    if config.sync.resource_types.is_empty() {
        errors.push("sync.resource_types must name at least one resource type".to_string());
    }
    for resource_type in &config.sync.resource_types {
        if resource_type.trim().is_empty() {
            errors.push("sync.resource_types entries must not be empty".to_string());
        }
    }
    if config.sync.page_size == 0 {
        errors.push("sync.page_size must be > 0".to_string());
    }
    if config.sync.concurrency == 0 {
        errors.push("sync.concurrency must be > 0".to_string());
    }

    if !errors.is_empty() {
        bail!("Invalid project configuration:\n  - {}", errors.join("\n  - "));
    }
    Ok(())
}

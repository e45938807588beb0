//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check header names and route paths are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("rendezvous.correlation_header: {0:?} is not a valid header name")]
    InvalidHeader(String),

    #[error("ingest.path: {value:?} {reason}")]
    InvalidPath { value: String, reason: &'static str },

    #[error("ingest.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("admin.api_key must not be empty when admin is enabled")]
    MissingApiKey,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.rendezvous.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "rendezvous.timeout_ms",
        });
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "upstream.request_timeout_secs",
        });
    }

    if HeaderName::try_from(config.rendezvous.correlation_header.as_str()).is_err() {
        errors.push(ValidationError::InvalidHeader(
            config.rendezvous.correlation_header.clone(),
        ));
    }

    if config.ingest.enabled {
        if let Err(reason) = check_route_path(&config.ingest.path) {
            errors.push(ValidationError::InvalidPath {
                value: config.ingest.path.clone(),
                reason,
            });
        } else if config.admin.enabled && config.ingest.path.starts_with("/admin/") {
            errors.push(ValidationError::InvalidPath {
                value: config.ingest.path.clone(),
                reason: "overlaps the admin API",
            });
        }
        if config.ingest.max_body_bytes == 0 {
            errors.push(ValidationError::ZeroBodyLimit);
        }
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Reject paths axum's router would panic on.
fn check_route_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("must start with '/'");
    }

    for segment in path.split('/').skip(1) {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err("uses ':'/'*' captures; write them as '{name}'");
        }

        let mut open = false;
        let mut capture_len = 0;
        for c in segment.chars() {
            match c {
                '{' if open => return Err("has nested '{'"),
                '{' => {
                    open = true;
                    capture_len = 0;
                }
                '}' if !open => return Err("has unbalanced '}'"),
                '}' if capture_len == 0 => return Err("has an empty capture"),
                '}' => open = false,
                _ => capture_len += 1,
            }
        }
        if open {
            return Err("has unbalanced '{'");
        }
    }
    Ok(())
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check mounts and prefixes compose into well-formed paths
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting services
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Backend base URLs are not checked here; an unusable one is reported per
//!   request so the status contract stays the same in every deployment

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// Path reserved for the gateway's own status endpoint.
pub const STATUS_PATH: &str = "/healthz";

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("default timeout must be greater than zero")]
    ZeroDefaultTimeout,

    #[error("no services configured")]
    NoServices,

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("duplicate service '{0}'")]
    DuplicateService(String),

    #[error("service '{service}': mount '{mount}' must start with '/', not end with '/', and contain no route patterns")]
    InvalidMount { service: String, mount: String },

    #[error("service '{service}': mount '{mount}' is already used")]
    DuplicateMount { service: String, mount: String },

    #[error("service '{service}': mount '{mount}' is reserved")]
    ReservedMount { service: String, mount: String },

    #[error("service '{service}': path '{path}' must be empty or start with '/' and not end with '/'")]
    InvalidPrefix { service: String, path: String },

    #[error("service '{service}': fallback URL '{url}' is not an absolute http(s) URL")]
    InvalidFallbackUrl { service: String, url: String },

    #[error("service '{service}': timeout must be greater than zero")]
    ZeroTimeout { service: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.default_ms == 0 {
        errors.push(ValidationError::ZeroDefaultTimeout);
    }

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    let mut names = HashSet::new();
    let mut mounts = HashSet::new();

    for service in &config.services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        } else if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if !is_valid_mount(&service.mount) {
            errors.push(ValidationError::InvalidMount {
                service: service.name.clone(),
                mount: service.mount.clone(),
            });
        } else if service.mount == STATUS_PATH {
            errors.push(ValidationError::ReservedMount {
                service: service.name.clone(),
                mount: service.mount.clone(),
            });
        } else if !mounts.insert(service.mount.as_str()) {
            errors.push(ValidationError::DuplicateMount {
                service: service.name.clone(),
                mount: service.mount.clone(),
            });
        }

        for path in std::iter::once(&service.mount_prefix).chain(&service.strip_suffixes) {
            if !is_valid_prefix(path) {
                errors.push(ValidationError::InvalidPrefix {
                    service: service.name.clone(),
                    path: path.clone(),
                });
            }
        }

        let fallback_ok = url::Url::parse(&service.fallback_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !fallback_ok {
            errors.push(ValidationError::InvalidFallbackUrl {
                service: service.name.clone(),
                url: service.fallback_url.clone(),
            });
        }

        if service.timeout_ms == Some(0) {
            errors.push(ValidationError::ZeroTimeout {
                service: service.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_mount(mount: &str) -> bool {
    mount.len() > 1
        && mount.starts_with('/')
        && !mount.ends_with('/')
        && !mount.contains("//")
        && !mount.contains(['{', '}', '*', '?', '#'])
}

fn is_valid_prefix(path: &str) -> bool {
    path.is_empty() || is_valid_mount(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;

    fn service(name: &str, mount: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            mount: mount.to_string(),
            base_url: None,
            base_url_env: Vec::new(),
            fallback_url: "http://localhost:9000".to_string(),
            mount_prefix: String::new(),
            strip_suffixes: Vec::new(),
            trailing_slash: Default::default(),
            timeout_ms: None,
            delivery: Default::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.default_ms = 0;
        config.services = vec![
            service("a", "/api/a"),
            service("a", "/api/b/"),
            service("c", "/api/a"),
        ];
        config.services[2].fallback_url = "localhost:9000".into();
        config.services[2].timeout_ms = Some(0);
        config.services[2].mount_prefix = "v1/".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::ZeroDefaultTimeout));
        assert!(errors.contains(&ValidationError::DuplicateService("a".into())));
        assert!(errors.contains(&ValidationError::InvalidMount {
            service: "a".into(),
            mount: "/api/b/".into(),
        }));
        assert!(errors.contains(&ValidationError::DuplicateMount {
            service: "c".into(),
            mount: "/api/a".into(),
        }));
        assert!(errors.contains(&ValidationError::InvalidPrefix {
            service: "c".into(),
            path: "v1/".into(),
        }));
        assert!(errors.contains(&ValidationError::InvalidFallbackUrl {
            service: "c".into(),
            url: "localhost:9000".into(),
        }));
        assert!(errors.contains(&ValidationError::ZeroTimeout { service: "c".into() }));
    }

    #[test]
    fn status_path_is_reserved() {
        let mut config = GatewayConfig::default();
        config.services = vec![service("status", STATUS_PATH)];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ReservedMount {
                service: "status".into(),
                mount: STATUS_PATH.into(),
            }]
        );
    }

    #[test]
    fn mounts_reject_route_patterns() {
        assert!(is_valid_mount("/api/courses"));
        assert!(!is_valid_mount("/"));
        assert!(!is_valid_mount("api"));
        assert!(!is_valid_mount("/api/{id}"));
        assert!(!is_valid_mount("/api//x"));
        assert!(is_valid_prefix(""));
    }
}

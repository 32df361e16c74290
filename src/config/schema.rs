//! Configuration schema definitions.
//!
//! Every type derives Serde traits so a gateway can be described in TOML.
//! All fields have defaults; an empty file yields the built-in service table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment mode. `None` until resolved from the environment.
    pub mode: Option<DeploymentMode>,

    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout defaults.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Backend service definitions. Replaces the built-in table when present.
    pub services: Vec<ServiceConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: None,
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            services: builtin_services(),
        }
    }
}

impl GatewayConfig {
    /// Effective deployment mode; permissive unless resolved otherwise.
    pub fn mode(&self) -> DeploymentMode {
        self.mode.unwrap_or(DeploymentMode::Permissive)
    }

    /// Look up a service definition by name.
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Mutable lookup, mostly for tests and CLI overrides.
    pub fn service_mut(&mut self, name: &str) -> Option<&mut ServiceConfig> {
        self.services.iter_mut().find(|s| s.name == name)
    }
}

/// Whether a missing base URL is fatal or falls back to localhost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Production: a missing base URL fails every request to that service.
    #[serde(alias = "production")]
    Strict,
    /// Development: a missing base URL is replaced by the service fallback.
    #[serde(alias = "development")]
    Permissive,
}

impl DeploymentMode {
    /// Permissive deployments add diagnostic fields to error envelopes.
    pub fn exposes_diagnostics(self) -> bool {
        matches!(self, DeploymentMode::Permissive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentMode::Strict => "strict",
            DeploymentMode::Permissive => "permissive",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "production" => Ok(DeploymentMode::Strict),
            "permissive" | "development" => Ok(DeploymentMode::Permissive),
            other => Err(format!("unknown deployment mode '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Largest inbound body the gateway will read before treating it as absent.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for routes without their own override, in milliseconds.
    pub default_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { default_ms: 30_000 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for terminals, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Where the forwarded path goes relative to the backend mount prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// Always end the path with exactly one `/` before the query string.
    Always,
    /// Keep the joined segments as they are.
    #[default]
    Preserve,
}

/// What the inbound caller receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Relay the backend status and body (or the classified failure).
    #[default]
    Relay,
    /// Forward, then always answer `{"status":"ok"}`.
    Acknowledge,
}

/// Declarative description of one backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service identifier for logging/metrics.
    pub name: String,

    /// Inbound path under which the gateway serves this service.
    pub mount: String,

    /// Explicit base URL. Environment variables take precedence.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variables consulted for the base URL, first match wins.
    #[serde(default)]
    pub base_url_env: Vec<String>,

    /// Base URL used in permissive mode when nothing is configured.
    pub fallback_url: String,

    /// Path the backend expects in front of the forwarded segments.
    #[serde(default)]
    pub mount_prefix: String,

    /// Base URL suffixes stripped before the mount prefix is added.
    #[serde(default)]
    pub strip_suffixes: Vec<String>,

    #[serde(default)]
    pub trailing_slash: TrailingSlash,

    /// Per-service deadline override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub delivery: Delivery,
}

impl ServiceConfig {
    fn builtin(name: &str, mount: &str, env: &[&str], fallback: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            mount: mount.to_string(),
            base_url: None,
            base_url_env: env.iter().map(|v| v.to_string()).collect(),
            fallback_url: fallback.to_string(),
            mount_prefix: prefix.to_string(),
            strip_suffixes: Vec::new(),
            trailing_slash: TrailingSlash::Preserve,
            timeout_ms: None,
            delivery: Delivery::Relay,
        }
    }

    /// Name of the environment variable that overrides this service's timeout.
    pub fn timeout_env_var(&self) -> String {
        format!(
            "{}_TIMEOUT_MS",
            self.name.to_ascii_uppercase().replace('-', "_")
        )
    }
}

/// The backends the frontend talks to, with their mount conventions.
pub fn builtin_services() -> Vec<ServiceConfig> {
    let users = ServiceConfig::builtin(
        "users",
        "/api/users",
        &["USER_SERVICE_URL", "NEXT_PUBLIC_USER_SERVICE"],
        "http://localhost:8000",
        "/api/users",
    );

    let courses = ServiceConfig {
        strip_suffixes: vec!["/course/api".to_string()],
        trailing_slash: TrailingSlash::Always,
        ..ServiceConfig::builtin(
            "courses",
            "/api/courses",
            &["COURSE_SERVICE_URL", "NEXT_PUBLIC_COURSE_SERVICE"],
            "http://localhost:8002",
            "/course/api/courses",
        )
    };

    let content = ServiceConfig::builtin(
        "content",
        "/api/content",
        &["CONTENT_SERVICE_URL", "NEXT_PUBLIC_CONTENT_SERVICE"],
        "http://localhost:8003",
        "/api",
    );

    // Recommendation requests can trigger model scoring upstream.
    let recommendations = ServiceConfig {
        trailing_slash: TrailingSlash::Always,
        timeout_ms: Some(60_000),
        ..ServiceConfig::builtin(
            "recommendations",
            "/api/recommendations",
            &["RECOMMENDATION_SERVICE_URL", "NEXT_PUBLIC_RECOMMENDATION_SERVICE"],
            "http://localhost:8003",
            "/api/recommendations",
        )
    };

    let enrollments = ServiceConfig {
        strip_suffixes: vec!["/enrollment/api".to_string()],
        ..ServiceConfig::builtin(
            "enrollments",
            "/api/enrollments",
            &["ENROLL_SERVICE_URL", "NEXT_PUBLIC_ENROLL_SERVICE"],
            "http://localhost:8004",
            "/enrollment",
        )
    };

    let analytics = ServiceConfig {
        delivery: Delivery::Acknowledge,
        ..ServiceConfig::builtin(
            "analytics",
            "/api/event",
            &["ANALYTICS_SERVICE_URL"],
            "http://localhost:8005",
            "/api/events",
        )
    };

    vec![users, courses, content, recommendations, enrollments, analytics]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_builtin_table() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.services.len(), 6);
        assert_eq!(config.timeouts.default_ms, 30_000);
        assert!(config.mode.is_none());

        let recs = config.service("recommendations").unwrap();
        assert_eq!(recs.timeout_ms, Some(60_000));
        assert_eq!(recs.trailing_slash, TrailingSlash::Always);

        let events = config.service("analytics").unwrap();
        assert_eq!(events.delivery, Delivery::Acknowledge);
    }

    #[test]
    fn mode_accepts_environment_names() {
        assert_eq!("production".parse::<DeploymentMode>(), Ok(DeploymentMode::Strict));
        assert_eq!(" Development ".parse::<DeploymentMode>(), Ok(DeploymentMode::Permissive));
        assert!("staging".parse::<DeploymentMode>().is_err());

        let config: GatewayConfig = toml::from_str("mode = \"production\"").unwrap();
        assert_eq!(config.mode(), DeploymentMode::Strict);
    }

    #[test]
    fn services_section_replaces_builtins() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[services]]
            name = "catalog"
            mount = "/api/catalog"
            fallback_url = "http://localhost:9100"
            mount_prefix = "/v1"
            trailing_slash = "always"
            "#,
        )
        .unwrap();

        assert_eq!(config.services.len(), 1);
        let catalog = &config.services[0];
        assert_eq!(catalog.trailing_slash, TrailingSlash::Always);
        assert_eq!(catalog.delivery, Delivery::Relay);
        assert!(catalog.base_url_env.is_empty());
        assert_eq!(catalog.timeout_env_var(), "CATALOG_TIMEOUT_MS");
    }
}

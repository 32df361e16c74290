//! Resolved routes and route lookup.
//!
//! # Responsibilities
//! - Resolve each `ServiceConfig` into a `RouteConfig` once, at startup
//! - Apply the strict/permissive base-URL policy
//! - Look up the route serving an inbound path
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc` without locks)
//! - Mounts match on segment boundaries only
//! - A missing base URL is carried as a value and reported per request

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Delivery, DeploymentMode, GatewayConfig, ServiceConfig};
use crate::forward::ForwardError;
use crate::routing::compose::{compose_url, normalize_base, PathRule};

/// Where a route's base URL came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// Set explicitly by file or environment.
    Configured(String),
    /// Localhost default substituted in permissive mode.
    Fallback(String),
    /// Nothing configured in strict mode.
    Missing,
}

/// One backend, fully resolved.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub service: String,
    /// Inbound path prefix served by this route.
    pub mount: String,
    pub base: BaseUrl,
    /// Variable an operator should set, used in error details.
    pub env_hint: String,
    pub rule: PathRule,
    pub timeout: Duration,
    pub delivery: Delivery,
}

impl RouteConfig {
    /// Resolve a service definition under the given mode.
    pub fn resolve(service: &ServiceConfig, mode: DeploymentMode, default_timeout: Duration) -> Self {
        let env_hint = service
            .base_url_env
            .first()
            .cloned()
            .unwrap_or_else(|| format!("services.{}.base_url", service.name));

        let base = match service.base_url.as_deref() {
            Some(url) if !url.is_empty() => BaseUrl::Configured(url.to_string()),
            _ => match mode {
                DeploymentMode::Strict => {
                    tracing::error!(
                        service = %service.name,
                        variable = %env_hint,
                        "Base URL not configured; requests will fail with MISSING_ENV_VAR"
                    );
                    BaseUrl::Missing
                }
                DeploymentMode::Permissive => {
                    tracing::warn!(
                        service = %service.name,
                        variable = %env_hint,
                        fallback = %service.fallback_url,
                        "Base URL not configured; using fallback URL"
                    );
                    BaseUrl::Fallback(service.fallback_url.clone())
                }
            },
        };

        let timeout = service
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);

        Self {
            service: service.name.clone(),
            mount: service.mount.clone(),
            base,
            env_hint,
            rule: PathRule::from_service(service),
            timeout,
            delivery: service.delivery,
        }
    }

    /// Normalized base URL, or the configuration error to report.
    pub fn base_url(&self) -> Result<&str, ForwardError> {
        let raw = match &self.base {
            BaseUrl::Configured(url) | BaseUrl::Fallback(url) => url,
            BaseUrl::Missing => {
                return Err(ForwardError::MissingBaseUrl {
                    service: self.service.clone(),
                    var: self.env_hint.clone(),
                })
            }
        };

        normalize_base(raw).ok_or_else(|| ForwardError::InvalidBaseUrl {
            service: self.service.clone(),
        })
    }

    /// Absolute URL for the given path segments and raw query.
    pub fn target_url<S: AsRef<str>>(&self, segments: &[S], query: &str) -> Result<String, ForwardError> {
        let base = self.base_url()?;
        Ok(compose_url(base, &self.rule, segments, query))
    }

    /// Does `path` fall under this route's mount?
    pub fn serves(&self, path: &str) -> bool {
        self.relative_path(path).is_some()
    }

    /// The part of `path` after the mount, or `None` if it is not under it.
    pub fn relative_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.mount.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// All routes, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteConfig>>,
}

impl RouteTable {
    /// Resolve every configured service.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mode = config.mode();
        let default_timeout = Duration::from_millis(config.timeouts.default_ms);
        let routes = config
            .services
            .iter()
            .map(|service| Arc::new(RouteConfig::resolve(service, mode, default_timeout)))
            .collect();
        Self { routes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteConfig>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route by service name.
    pub fn get(&self, service: &str) -> Option<&Arc<RouteConfig>> {
        self.routes.iter().find(|r| r.service == service)
    }

    /// Route serving an inbound path; the longest mount wins.
    pub fn match_path(&self, path: &str) -> Option<&Arc<RouteConfig>> {
        self.routes
            .iter()
            .filter(|r| r.serves(path))
            .max_by_key(|r| r.mount.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::ErrorCode;

    fn table(mode: DeploymentMode, course_url: Option<&str>) -> RouteTable {
        let mut config = GatewayConfig {
            mode: Some(mode),
            ..GatewayConfig::default()
        };
        config.service_mut("courses").unwrap().base_url = course_url.map(String::from);
        RouteTable::from_config(&config)
    }

    #[test]
    fn permissive_mode_uses_fallback() {
        let routes = table(DeploymentMode::Permissive, None);
        let courses = routes.get("courses").unwrap();
        assert_eq!(courses.base, BaseUrl::Fallback("http://localhost:8002".into()));
        assert_eq!(
            courses.target_url(&["123"], "limit=10").unwrap(),
            "http://localhost:8002/course/api/courses/123/?limit=10"
        );
    }

    #[test]
    fn strict_mode_reports_missing_variable() {
        let routes = table(DeploymentMode::Strict, None);
        let err = routes.get("courses").unwrap().target_url(&["1"], "").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingEnvVar);
        assert_eq!(err.status().as_u16(), 500);
        assert!(err.to_string().contains("COURSE_SERVICE_URL"));
    }

    #[test]
    fn blank_base_is_invalid_in_every_mode() {
        for mode in [DeploymentMode::Strict, DeploymentMode::Permissive] {
            for blank in ["   ", "/"] {
                let routes = table(mode, Some(blank));
                let err = routes.get("courses").unwrap().base_url().unwrap_err();
                assert_eq!(err.code(), ErrorCode::InvalidUrl, "{:?} {:?}", mode, blank);
            }
        }
    }

    #[test]
    fn timeouts_resolve_per_route() {
        let routes = table(DeploymentMode::Permissive, None);
        assert_eq!(routes.get("users").unwrap().timeout, Duration::from_secs(30));
        assert_eq!(
            routes.get("recommendations").unwrap().timeout,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn matches_on_segment_boundaries() {
        let routes = table(DeploymentMode::Permissive, Some("http://c"));
        assert_eq!(routes.match_path("/api/courses/5").unwrap().service, "courses");
        assert_eq!(routes.match_path("/api/courses").unwrap().service, "courses");
        assert_eq!(routes.match_path("/api/event").unwrap().service, "analytics");
        assert!(routes.match_path("/api/coursesx").is_none());
        assert!(routes.match_path("/api/events").is_none());
        assert!(routes.match_path("/healthz").is_none());

        let courses = routes.get("courses").unwrap();
        assert_eq!(courses.relative_path("/api/courses/5/"), Some("/5/"));
        assert_eq!(courses.relative_path("/api/courses"), Some(""));
    }

    #[test]
    fn every_builtin_route_composes_deterministically() {
        let routes = table(DeploymentMode::Permissive, None);
        for route in routes.iter() {
            let first = route.target_url(&["a", "b"], "x=1").unwrap();
            let second = route.target_url(&["a", "b"], "x=1").unwrap();
            assert_eq!(first, second);
            if !route.rule.mount_prefix.is_empty() {
                let doubled = format!("{0}{0}", route.rule.mount_prefix);
                assert!(!first.contains(&doubled), "{}", first);
            }
        }
    }
}

//! Target URL composition.
//!
//! # Responsibilities
//! - Normalize a configured base URL
//! - Strip a mount prefix the base URL already carries
//! - Join forwarded segments under the backend's mount prefix
//! - Apply the backend's trailing-slash policy and append the query
//!
//! # Design Decisions
//! - Pure string functions: same inputs always give the same URL
//! - Suffix stripping never reaches into the scheme or authority
//! - Empty segments are dropped so no `//` is ever introduced

use crate::config::{ServiceConfig, TrailingSlash};

/// How one backend expects forwarded paths to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    /// Prefix placed in front of the forwarded segments (may be empty).
    pub mount_prefix: String,
    /// Extra base-URL suffixes that duplicate part of the prefix.
    pub strip_suffixes: Vec<String>,
    pub trailing_slash: TrailingSlash,
}

impl PathRule {
    pub fn from_service(service: &ServiceConfig) -> Self {
        Self {
            mount_prefix: service.mount_prefix.clone(),
            strip_suffixes: service.strip_suffixes.clone(),
            trailing_slash: service.trailing_slash,
        }
    }

    /// Candidate suffixes, longest first so `/enrollment/api` beats `/enrollment`.
    fn suffixes(&self) -> Vec<&str> {
        let mut suffixes: Vec<&str> = std::iter::once(self.mount_prefix.as_str())
            .chain(self.strip_suffixes.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        suffixes
    }
}

/// Strip exactly one trailing slash; `None` when nothing usable remains.
pub fn normalize_base(raw: &str) -> Option<&str> {
    let base = raw.strip_suffix('/').unwrap_or(raw);
    if base.trim().is_empty() {
        None
    } else {
        Some(base)
    }
}

/// Byte offset where the path of `base` begins (after scheme and authority).
fn path_start(base: &str) -> usize {
    match base.find("://") {
        Some(scheme_end) => {
            let authority = scheme_end + 3;
            base[authority..]
                .find('/')
                .map_or(base.len(), |slash| authority + slash)
        }
        None => 0,
    }
}

/// Remove one mount prefix (or configured alias) already present on `base`.
pub fn strip_mount<'a>(base: &'a str, rule: &PathRule) -> &'a str {
    let floor = path_start(base);
    for suffix in rule.suffixes() {
        if let Some(stripped) = base.strip_suffix(suffix) {
            if stripped.len() >= floor {
                return stripped;
            }
        }
    }
    base
}

/// Join path segments with `/`, dropping empty pieces.
///
/// A segment may itself contain slashes (CLI input); those are split too.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .flat_map(|segment| segment.as_ref().split('/'))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compose the absolute target URL for a normalized base.
pub fn compose_url<S: AsRef<str>>(base: &str, rule: &PathRule, segments: &[S], query: &str) -> String {
    let path = join_segments(segments);
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut url = String::with_capacity(base.len() + rule.mount_prefix.len() + path.len() + query.len() + 3);
    url.push_str(strip_mount(base, rule));
    url.push_str(&rule.mount_prefix);

    match rule.trailing_slash {
        TrailingSlash::Always => {
            url.push('/');
            if !path.is_empty() {
                url.push_str(&path);
                url.push('/');
            }
        }
        TrailingSlash::Preserve => {
            if !path.is_empty() {
                url.push('/');
                url.push_str(&path);
            }
        }
    }

    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }

    url
}

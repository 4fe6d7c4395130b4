//! Base URL resolution for API calls.
//!
//! # Design
//! - The base value is seeded once from the environment and may be replaced
//!   later by bootstrap code through [`BaseUrl::set`].
//! - Stored values never end with `/`, so joining with a `/`-prefixed path
//!   never doubles the separator.
//! - Relative paths are only expanded when they start with `/`; anything else
//!   is passed through untouched.

use std::sync::{PoisonError, RwLock};

/// Base URL baked in at compile time, if the build provided one.
pub const BUILD_TIME_BASE_URL: Option<&str> = option_env!("BOBBIN_API_BASE");

/// Process environment variables consulted, in order, after the build value.
pub const PROCESS_ENV_KEYS: [&str; 2] = ["API_BASE_URL", "VITE_API_BASE"];

/// Candidate base addresses in precedence order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BaseUrlSources {
    /// Override injected by the running host.
    pub runtime: Option<String>,
    /// Value fixed when the binary was built.
    pub build_time: Option<String>,
    /// Value read from the process environment.
    pub process_env: Option<String>,
}

impl BaseUrlSources {
    /// Collect sources from the build and process environment, with an
    /// optional runtime override supplied by the host.
    #[must_use]
    pub fn from_env(runtime: Option<String>) -> Self {
        let process_env = PROCESS_ENV_KEYS
            .iter()
            .find_map(|key| std::env::var(key).ok().filter(|value| !value.is_empty()));
        Self {
            runtime,
            build_time: BUILD_TIME_BASE_URL.map(str::to_string),
            process_env,
        }
    }
}

/// Pick the first non-empty source (runtime, build time, process env) and
/// strip trailing slashes. Returns an empty string when nothing is set.
#[must_use]
pub fn resolve_base_url(sources: &BaseUrlSources) -> String {
    [
        sources.runtime.as_deref(),
        sources.build_time.as_deref(),
        sources.process_env.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|candidate| !candidate.is_empty())
    .map(|candidate| trim_trailing_slashes(candidate).to_string())
    .unwrap_or_default()
}

/// Remove every trailing `/` from `url`.
#[must_use]
pub fn trim_trailing_slashes(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Whether `url` already carries an `http`/`https` scheme.
#[must_use]
pub fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Expand `path` against `base`.
///
/// Absolute URLs and paths not starting with `/` come back unchanged.
#[must_use]
pub fn join_base(base: &str, path: &str) -> String {
    if path.is_empty() || is_absolute(path) || !path.starts_with('/') {
        return path.to_string();
    }
    format!("{base}{path}")
}

/// Mutable API base address shared by the request facade.
#[derive(Debug, Default)]
pub struct BaseUrl {
    value: RwLock<String>,
}

impl BaseUrl {
    /// Create a base URL from an initial value.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self {
            value: RwLock::new(trim_trailing_slashes(initial).to_string()),
        }
    }

    /// Seed the base URL from the resolved sources.
    #[must_use]
    pub fn from_sources(sources: &BaseUrlSources) -> Self {
        Self::new(&resolve_base_url(sources))
    }

    /// Current base value.
    #[must_use]
    pub fn get(&self) -> String {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether no base address has been configured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Replace the base value. Trailing slashes are trimmed; reachability is
    /// not checked.
    pub fn set(&self, url: &str) {
        let trimmed = trim_trailing_slashes(url).to_string();
        tracing::debug!(base_url = %trimmed, "base url updated");
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = trimmed;
    }

    /// Build the absolute URL for `path` against the current base.
    #[must_use]
    pub fn to_absolute_url(&self, path: &str) -> String {
        let base = self.value.read().unwrap_or_else(PoisonError::into_inner);
        join_base(&base, path)
    }
}

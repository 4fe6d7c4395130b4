//! Application launch routing and the per-page session guard.
//!
//! # Design
//! - Launch configures the base address for the host environment, then
//!   routes to the home tab (valid session) or the login page (anything else).
//! - The guard is a read-only check; eviction stays with the request path.

use std::time::Duration;

use tracing::{info, warn};

use crate::facade::ClientContext;
use crate::host::{HOME_ROUTE, LOGIN_ROUTE};
use crate::session::SessionState;

/// Local backend used by mini-program development builds.
pub const DEV_SERVICE_BASE_URL: &str = "http://localhost:8888";

const LAUNCH_FAILURE_MESSAGE: &str = "页面加载失败，请重启应用";

/// Host runtime the client is running in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Mini-program runtime: no proxy, requests need absolute URLs.
    MiniProgram,
    /// Browser runtime: a dev-server proxy serves relative paths.
    H5,
}

/// Build flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildProfile {
    /// Local development.
    Development,
    /// Release build.
    Production,
}

/// Launch-time settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Host runtime.
    pub environment: Environment,
    /// Build flavour.
    pub profile: BuildProfile,
    /// Service address used by production mini-program builds.
    pub production_base_url: Option<String>,
    /// Pause before the first switch to the home tab.
    pub initial_delay: Duration,
    /// Attempts at switching to the home tab before relaunching.
    pub switch_tab_attempts: u32,
    /// Base delay between switch attempts; grows with each failure.
    pub retry_delay: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            environment: Environment::MiniProgram,
            profile: BuildProfile::Development,
            production_base_url: None,
            initial_delay: Duration::from_millis(200),
            switch_tab_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Where launch ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Home tab opened through tab switching.
    Home,
    /// Home opened through the relaunch fallback.
    HomeRelaunched,
    /// Login page opened.
    Login,
    /// No navigation succeeded; the user was told to restart.
    Stranded,
}

/// Result of a page guard check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Session valid; the page may render.
    Allowed,
    /// Already on the login page.
    OnLoginPage,
    /// Session invalid; a relaunch to login was requested.
    Redirected,
}

/// Apply the environment's base-address policy.
///
/// Only a mini-program host with no configured base is touched: development
/// builds point at [`DEV_SERVICE_BASE_URL`], production builds at
/// `production_base_url` when one is known. Returns the value applied.
pub fn configure_base_url(context: &ClientContext, config: &LaunchConfig) -> Option<String> {
    if config.environment != Environment::MiniProgram || !context.base_url.is_empty() {
        return None;
    }
    let target = match config.profile {
        BuildProfile::Development => Some(DEV_SERVICE_BASE_URL.to_string()),
        BuildProfile::Production => config
            .production_base_url
            .clone()
            .filter(|url| !url.is_empty()),
    };
    match &target {
        Some(url) => {
            context.base_url.set(url);
            info!(base_url = %url, "base url configured for mini-program");
        }
        None => warn!("mini-program production build has no base url; call set_base_url"),
    }
    target
}

/// Run the launch sequence.
pub async fn launch(context: &ClientContext, config: &LaunchConfig) -> LaunchOutcome {
    configure_base_url(context, config);

    if context.session.check().is_err() {
        return open_login(context);
    }
    open_home(context, config).await
}

fn open_login(context: &ClientContext) -> LaunchOutcome {
    if let Err(err) = context.navigator.redirect(LOGIN_ROUTE) {
        warn!(error = %err, "redirect to login failed; relaunching");
        if let Err(err) = context.navigator.relaunch(LOGIN_ROUTE) {
            warn!(error = %err, "relaunch to login failed");
            context.presenter.show_error(LAUNCH_FAILURE_MESSAGE);
            return LaunchOutcome::Stranded;
        }
    }
    LaunchOutcome::Login
}

async fn open_home(context: &ClientContext, config: &LaunchConfig) -> LaunchOutcome {
    tokio::time::sleep(config.initial_delay).await;
    let attempts = config.switch_tab_attempts.max(1);
    for attempt in 1..=attempts {
        match context.navigator.switch_tab(HOME_ROUTE) {
            Ok(()) => return LaunchOutcome::Home,
            Err(err) => {
                warn!(attempt, attempts, error = %err, "switch to home tab failed");
                if attempt < attempts {
                    tokio::time::sleep(config.retry_delay * attempt).await;
                }
            }
        }
    }

    match context.navigator.relaunch(HOME_ROUTE) {
        Ok(()) => LaunchOutcome::HomeRelaunched,
        Err(err) => {
            warn!(error = %err, "every navigation to home failed");
            context.presenter.show_error(LAUNCH_FAILURE_MESSAGE);
            LaunchOutcome::Stranded
        }
    }
}

/// Guard a page render: valid sessions pass, the login page always passes,
/// everything else is relaunched to login.
pub fn guard(context: &ClientContext, current_route: &str) -> GuardOutcome {
    if context.session.state() == SessionState::Valid {
        return GuardOutcome::Allowed;
    }
    if current_route.trim_start_matches('/') == LOGIN_ROUTE.trim_start_matches('/') {
        return GuardOutcome::OnLoginPage;
    }
    if let Err(err) = context.navigator.relaunch(LOGIN_ROUTE) {
        warn!(error = %err, "guard redirect failed");
    }
    GuardOutcome::Redirected
}

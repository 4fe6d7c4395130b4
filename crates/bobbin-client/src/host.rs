//! Host capabilities consumed by the request layer (presentation, navigation,
//! time).

use thiserror::Error;

/// Route of the login entry point.
pub const LOGIN_ROUTE: &str = "/pages/login/index";
/// Route of the home tab.
pub const HOME_ROUTE: &str = "/pages/index/index";

/// Toast and loading-indicator presentation.
pub trait Presenter: Send + Sync {
    /// Show the blocking loading indicator.
    fn show_loading(&self, title: &str);
    /// Hide the loading indicator.
    fn hide_loading(&self);
    /// Show an error toast.
    fn show_error(&self, message: &str);
    /// Show a success toast.
    fn show_success(&self, message: &str);
}

/// Navigation request rejected by the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("navigation to {url} failed: {reason}")]
pub struct NavigationError {
    /// Target route.
    pub url: String,
    /// Host-provided reason.
    pub reason: String,
}

/// Page navigation.
pub trait Navigator: Send + Sync {
    /// Replace the current page with `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host refuses the navigation.
    fn redirect(&self, url: &str) -> Result<(), NavigationError>;

    /// Close every page and open `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host refuses the navigation.
    fn relaunch(&self, url: &str) -> Result<(), NavigationError>;

    /// Switch to the tab page at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host refuses the navigation.
    fn switch_tab(&self, url: &str) -> Result<(), NavigationError>;
}

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

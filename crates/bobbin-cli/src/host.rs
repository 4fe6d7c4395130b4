//! Terminal renditions of the host presentation and navigation capabilities.

use std::sync::{Mutex, PoisonError};

use bobbin_client::{NavigationError, Navigator, Presenter};
use tracing::{debug, info};

/// Writes toasts to stderr; the loading indicator only reaches the log.
#[derive(Debug, Default)]
pub(crate) struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn show_loading(&self, title: &str) {
        debug!(title, "loading");
    }

    fn hide_loading(&self) {
        debug!("loading finished");
    }

    fn show_error(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn show_success(&self, message: &str) {
        eprintln!("ok: {message}");
    }
}

/// How a route was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RouteChange {
    Redirect,
    Relaunch,
    SwitchTab,
}

impl RouteChange {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::Relaunch => "relaunch",
            Self::SwitchTab => "switch_tab",
        }
    }
}

/// Remembers the last route a flow navigated to; there are no pages to show.
#[derive(Debug, Default)]
pub(crate) struct TerminalNavigator {
    current: Mutex<Option<(RouteChange, String)>>,
}

impl TerminalNavigator {
    pub(crate) fn current(&self) -> Option<(RouteChange, String)> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn go(&self, change: RouteChange, url: &str) -> Result<(), NavigationError> {
        info!(kind = change.as_str(), route = url, "navigation");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((change, url.to_string()));
        Ok(())
    }
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, url: &str) -> Result<(), NavigationError> {
        self.go(RouteChange::Redirect, url)
    }

    fn relaunch(&self, url: &str) -> Result<(), NavigationError> {
        self.go(RouteChange::Relaunch, url)
    }

    fn switch_tab(&self, url: &str) -> Result<(), NavigationError> {
        self.go(RouteChange::SwitchTab, url)
    }
}

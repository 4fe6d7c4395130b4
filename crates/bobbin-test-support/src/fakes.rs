//! Spy implementations of the host capabilities.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bobbin_client::{Clock, NavigationError, Navigator, Presenter};

/// Clock pinned to a settable instant.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    /// Clock reading `now_ms`.
    #[must_use]
    pub const fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Move the clock to `now_ms`.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Presenter that counts indicator calls and records toasts.
#[derive(Debug, Default)]
pub struct CountingPresenter {
    shown: AtomicUsize,
    hidden: AtomicUsize,
    errors: Mutex<Vec<String>>,
    successes: Mutex<Vec<String>>,
}

impl CountingPresenter {
    /// Number of `show_loading` calls.
    #[must_use]
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    /// Number of `hide_loading` calls.
    #[must_use]
    pub fn hidden(&self) -> usize {
        self.hidden.load(Ordering::SeqCst)
    }

    /// Error toasts in call order.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    /// Success toasts in call order.
    #[must_use]
    pub fn successes(&self) -> Vec<String> {
        lock(&self.successes).clone()
    }
}

impl Presenter for CountingPresenter {
    fn show_loading(&self, _title: &str) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide_loading(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }

    fn show_error(&self, message: &str) {
        lock(&self.errors).push(message.to_string());
    }

    fn show_success(&self, message: &str) {
        lock(&self.successes).push(message.to_string());
    }
}

/// Kind of navigation requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationKind {
    /// `redirect`
    Redirect,
    /// `relaunch`
    Relaunch,
    /// `switch_tab`
    SwitchTab,
}

/// Navigator that records every request and can be told to refuse some.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<(NavigationKind, String)>>,
    failing_switches: AtomicUsize,
    refuse_all: std::sync::atomic::AtomicBool,
}

impl RecordingNavigator {
    /// Refuse the next `count` tab switches.
    pub fn fail_next_switches(&self, count: usize) {
        self.failing_switches.store(count, Ordering::SeqCst);
    }

    /// Refuse every navigation from now on.
    pub fn refuse_all(&self) {
        self.refuse_all.store(true, Ordering::SeqCst);
    }

    /// Every navigation request in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<(NavigationKind, String)> {
        lock(&self.calls).clone()
    }

    /// Number of requests of `kind` towards `url`.
    #[must_use]
    pub fn count(&self, kind: NavigationKind, url: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(recorded, target)| *recorded == kind && target == url)
            .count()
    }

    fn record(&self, kind: NavigationKind, url: &str) -> Result<(), NavigationError> {
        lock(&self.calls).push((kind, url.to_string()));
        let refused = self.refuse_all.load(Ordering::SeqCst)
            || (kind == NavigationKind::SwitchTab
                && self
                    .failing_switches
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                    .is_ok());
        if refused {
            Err(NavigationError {
                url: url.to_string(),
                reason: "refused by test navigator".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &str) -> Result<(), NavigationError> {
        self.record(NavigationKind::Redirect, url)
    }

    fn relaunch(&self, url: &str) -> Result<(), NavigationError> {
        self.record(NavigationKind::Relaunch, url)
    }

    fn switch_tab(&self, url: &str) -> Result<(), NavigationError> {
        self.record(NavigationKind::SwitchTab, url)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Wired client harness for integration tests.

use std::sync::Arc;

use bobbin_client::{
    BaseUrl, ClientContext, LoginGrant, MemoryStore, RequestFacade, Session, SessionStore,
    StorageResult, Token, UserInfo,
};

use crate::fakes::{CountingPresenter, FixedClock, RecordingNavigator};

/// Fixed "now" used by harnesses (2023-11-14T22:13:20Z).
pub const NOW_MS: i64 = 1_700_000_000_000;

/// Facade plus direct handles on every fake behind it.
pub struct Harness {
    /// Facade under test.
    pub facade: RequestFacade,
    /// Context shared with the facade.
    pub context: ClientContext,
    /// Backing storage.
    pub storage: Arc<MemoryStore>,
    /// Clock driving session expiry.
    pub clock: Arc<FixedClock>,
    /// Presenter spy.
    pub presenter: Arc<CountingPresenter>,
    /// Navigator spy.
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    /// Harness pointed at `base_url` (usually a mock server).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let storage = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(NOW_MS));
        let presenter = Arc::new(CountingPresenter::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let context = ClientContext {
            base_url: Arc::new(BaseUrl::new(base_url)),
            session: Arc::new(SessionStore::new(storage.clone(), clock.clone())),
            presenter: presenter.clone(),
            navigator: navigator.clone(),
        };
        let facade = RequestFacade::new(reqwest::Client::new(), context.clone());
        Self {
            facade,
            context,
            storage,
            clock,
            presenter,
            navigator,
        }
    }

    /// Log in directly through the session store with `token`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn login(&self, token: &str) -> StorageResult<Session> {
        self.context.session.establish(sample_grant(token))
    }
}

/// Login grant for user `u-1` with the given token.
#[must_use]
pub fn sample_grant(token: &str) -> LoginGrant {
    LoginGrant {
        token: Token::new(token),
        openid: "openid-1".to_string(),
        user_info: UserInfo {
            user_id: "u-1".to_string(),
            openid: "openid-1".to_string(),
            role: Some("manager".to_string()),
            enabled: None,
        },
    }
}

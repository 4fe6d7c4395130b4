//! Shared HTTP client construction, error types, and the wired client context.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use bobbin_client::{
    BaseUrl, BaseUrlSources, ClientContext, ClientError, RequestFacade, SessionStore, SystemClock,
};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::host::{TerminalNavigator, TerminalPresenter};
use crate::store::FileStore;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        let rejected = match &err {
            ClientError::Business { .. } | ClientError::Login { .. } | ClientError::Upload { .. } => true,
            ClientError::Status { status, .. } => matches!(*status, 400 | 409 | 422),
            _ => false,
        };
        if rejected {
            return Self::validation(err.user_message());
        }
        if let ClientError::Status {
            status,
            message: Some(message),
            ..
        } = &err
        {
            return Self::failure(anyhow!("{message} (status {status})"));
        }
        Self::failure(err)
    }
}

/// Dependencies constructed from CLI options.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
}

impl CliDependencies {
    /// Build the HTTP client with the request timeout and a request id
    /// attached to every call.
    pub(crate) fn new(timeout_secs: u64, request_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(request_id).map_err(|_| {
            CliError::failure(anyhow!("request identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self { client })
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) facade: RequestFacade,
    pub(crate) navigator: Arc<TerminalNavigator>,
    pub(crate) state_file: PathBuf,
}

impl AppContext {
    /// Wire the facade over file-backed storage and the terminal host.
    pub(crate) fn new(client: Client, base_url: BaseUrl, state_file: PathBuf) -> Self {
        let navigator = Arc::new(TerminalNavigator::default());
        let store = Arc::new(FileStore::new(&state_file));
        let context = ClientContext {
            base_url: Arc::new(base_url),
            session: Arc::new(SessionStore::new(store, Arc::new(SystemClock))),
            presenter: Arc::new(TerminalPresenter),
            navigator: navigator.clone(),
        };
        Self {
            facade: RequestFacade::new(client, context),
            navigator,
            state_file,
        }
    }

    /// Resolve the base URL from the flag (runtime override) and the
    /// environment, then wire the context.
    pub(crate) fn from_options(
        deps: &CliDependencies,
        api_url: Option<&Url>,
        state_file: PathBuf,
    ) -> Self {
        let sources = BaseUrlSources::from_env(api_url.map(ToString::to_string));
        Self::new(deps.client.clone(), BaseUrl::from_sources(&sources), state_file)
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    let url = input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(format!("invalid URL '{input}': expected http or https"))
    }
}

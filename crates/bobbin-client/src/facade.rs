//! Request facade: the single path application code uses to reach the API.
//!
//! # Design
//! - Every call resolves its URL through [`BaseUrl`] and asks the
//!   [`SessionStore`] for a token; the bearer header is attached only when a
//!   token is obtained.
//! - An invalid session never surfaces as an error here: the facade
//!   relaunches to the login route and sends the call unauthenticated.
//! - The loading indicator is released by a drop guard, so no exit path can
//!   leave it showing.

use std::fmt;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::address::BaseUrl;
use crate::envelope::{BATCH_PATH, BatchResponse, RequestEnvelope, business_failure, failure_message};
use crate::error::{ClientError, ClientResult};
use crate::host::{HOME_ROUTE, LOGIN_ROUTE, Navigator, Presenter};
use crate::pagination::{Page, PageMethod, PageOptions, ParamType, normalize};
use crate::session::{LoginGrant, Session, SessionStore, Token, UserInfo};

/// Path of the code-for-token login exchange.
pub const LOGIN_PATH: &str = "/api/wechat/openid";

pub(crate) const LOADING_TITLE: &str = "加载中...";
const LOGIN_SUCCESS_MESSAGE: &str = "登录成功";
const LOGIN_FAILURE_MESSAGE: &str = "登录失败，请重试";
const LOGIN_CODE_MISSING_MESSAGE: &str = "微信登录失败，请稍后再试";

/// Shared state injected into the facade and the launch flow.
#[derive(Clone)]
pub struct ClientContext {
    /// API base address.
    pub base_url: Arc<BaseUrl>,
    /// Authentication session.
    pub session: Arc<SessionStore>,
    /// Toast and loading presentation.
    pub presenter: Arc<dyn Presenter>,
    /// Page navigation.
    pub navigator: Arc<dyn Navigator>,
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientContext")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ClientContext {
    /// Resolve the bearer token for a protected call.
    ///
    /// On an invalid session the store has already evicted; this relaunches
    /// to the login route and returns `None`.
    pub(crate) fn bearer_token(&self) -> Option<Token> {
        match self.session.check() {
            Ok(token) => Some(token),
            Err(reason) => {
                debug!(%reason, "continuing without credentials");
                if let Err(err) = self.navigator.relaunch(LOGIN_ROUTE) {
                    warn!(error = %err, "failed to redirect to login");
                }
                None
            }
        }
    }

    /// Leave the login page for the home tab, relaunching when the tab
    /// switch is refused.
    pub(crate) fn enter_home(&self) {
        if let Err(err) = self.navigator.switch_tab(HOME_ROUTE) {
            warn!(error = %err, "switch to home tab failed; relaunching");
            if let Err(err) = self.navigator.relaunch(HOME_ROUTE) {
                warn!(error = %err, "relaunch to home failed");
            }
        }
    }
}

/// Whether a call carries the session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Auth {
    Session,
    Anonymous,
}

/// Shows the loading indicator on creation and hides it on drop.
pub(crate) struct LoadingGuard<'a> {
    presenter: &'a dyn Presenter,
}

impl<'a> LoadingGuard<'a> {
    pub(crate) fn show(presenter: &'a dyn Presenter, title: &str) -> Self {
        presenter.show_loading(title);
        Self { presenter }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.presenter.hide_loading();
    }
}

/// HTTP facade with bearer injection and response normalization.
#[derive(Clone, Debug)]
pub struct RequestFacade {
    http: Client,
    context: ClientContext,
}

impl RequestFacade {
    /// Create a facade over a configured HTTP client and the shared context.
    #[must_use]
    pub const fn new(http: Client, context: ClientContext) -> Self {
        Self { http, context }
    }

    /// Shared context.
    #[must_use]
    pub const fn context(&self) -> &ClientContext {
        &self.context
    }

    pub(crate) const fn http(&self) -> &Client {
        &self.http
    }

    /// Session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.context.session
    }

    /// Replace the API base address.
    pub fn set_base_url(&self, url: &str) {
        self.context.base_url.set(url);
    }

    /// Absolute URL for `path` against the current base.
    #[must_use]
    pub fn to_absolute_url(&self, path: &str) -> String {
        self.context.base_url.to_absolute_url(path)
    }

    /// GET `url`, encoding `params` as the query string.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or a body
    /// that is not JSON.
    pub async fn get(&self, url: &str, params: Option<&Value>) -> ClientResult<Value> {
        self.send(Method::GET, url, params, None, Auth::Session).await
    }

    /// POST `body` (default `{}`) to `url`.
    ///
    /// # Errors
    ///
    /// See [`RequestFacade::get`].
    pub async fn post(&self, url: &str, body: Option<&Value>) -> ClientResult<Value> {
        let body = body.cloned().unwrap_or_else(empty_object);
        self.send(Method::POST, url, None, Some(&body), Auth::Session)
            .await
    }

    /// PUT `body` (default `{}`) to `url`.
    ///
    /// # Errors
    ///
    /// See [`RequestFacade::get`].
    pub async fn put(&self, url: &str, body: Option<&Value>) -> ClientResult<Value> {
        let body = body.cloned().unwrap_or_else(empty_object);
        self.send(Method::PUT, url, None, Some(&body), Auth::Session)
            .await
    }

    /// DELETE `url`, encoding `params` as the query string.
    ///
    /// # Errors
    ///
    /// See [`RequestFacade::get`].
    pub async fn delete(&self, url: &str, params: Option<&Value>) -> ClientResult<Value> {
        self.send(Method::DELETE, url, params, None, Auth::Session)
            .await
    }

    /// Send `envelope` to the batch endpoint.
    ///
    /// The response is returned as-is; call [`BatchResponse::into_data`] to
    /// turn a backend refusal into an error.
    ///
    /// # Errors
    ///
    /// See [`RequestFacade::get`].
    pub async fn batch(&self, envelope: &RequestEnvelope) -> ClientResult<BatchResponse> {
        let url = self.to_absolute_url(BATCH_PATH);
        let body = serde_json::to_value(envelope)
            .map_err(|source| ClientError::Decode { url: url.clone(), source })?;
        let value = self.post(BATCH_PATH, Some(&body)).await?;
        serde_json::from_value(value).map_err(|source| ClientError::Decode { url, source })
    }

    /// Call a list endpoint behind the loading indicator and normalize the
    /// result into a [`Page`].
    ///
    /// The indicator is hidden exactly once whatever the outcome. Failures
    /// (including backend refusals) raise an error toast before returning.
    ///
    /// # Errors
    ///
    /// Returns the transport, status, decode or business error that occurred.
    pub async fn request_with_loading_and_pagination(
        &self,
        url: &str,
        params: &Value,
        options: &PageOptions,
    ) -> ClientResult<Page> {
        let loading = LoadingGuard::show(self.context.presenter.as_ref(), LOADING_TITLE);
        let outcome = self.fetch_page(url, params, options).await;
        drop(loading);

        outcome.inspect_err(|err| {
            warn!(url, error = %err, "paginated request failed");
            self.context.presenter.show_error(&err.user_message());
        })
    }

    async fn fetch_page(&self, url: &str, params: &Value, options: &PageOptions) -> ClientResult<Page> {
        let body = match (options.method, options.param_type) {
            (PageMethod::Get, _) => self.get(url, Some(params)).await?,
            (PageMethod::Post, ParamType::Params) => {
                self.send(Method::POST, url, Some(params), Some(&empty_object()), Auth::Session)
                    .await?
            }
            (PageMethod::Post, ParamType::Body) => self.post(url, Some(params)).await?,
        };
        if let Some(err) = business_failure(&body) {
            return Err(err);
        }
        Ok(normalize(body, options))
    }

    /// Exchange a platform login code for a session.
    ///
    /// The call is sent without credentials. On success the session is
    /// persisted, a success toast is shown and the home tab is opened; on
    /// failure an error toast is shown and the error returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Login`] when the code is empty or the backend
    /// refuses, or the underlying transport/storage error.
    pub async fn login_with_code(&self, code: &str) -> ClientResult<Session> {
        let outcome = self.exchange_code(code).await;
        match &outcome {
            Ok(session) => {
                info!(user_id = %session.user_info.user_id, "login succeeded");
                self.context.presenter.show_success(LOGIN_SUCCESS_MESSAGE);
                self.context.enter_home();
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                self.context.presenter.show_error(&err.user_message());
            }
        }
        outcome
    }

    async fn exchange_code(&self, code: &str) -> ClientResult<Session> {
        if code.trim().is_empty() {
            return Err(ClientError::Login {
                message: LOGIN_CODE_MISSING_MESSAGE.to_string(),
            });
        }
        let body = json!({ "code": code });
        let value = self
            .send(Method::POST, LOGIN_PATH, None, Some(&body), Auth::Anonymous)
            .await?;
        let refused = || ClientError::Login {
            message: value
                .as_object()
                .and_then(failure_message)
                .unwrap_or_else(|| LOGIN_FAILURE_MESSAGE.to_string()),
        };
        let response: LoginResponse =
            serde_json::from_value(value.clone()).map_err(|_| refused())?;
        let data = match response.data {
            Some(data) if response.code == Some(200) && !data.token.is_empty() => data,
            _ => return Err(refused()),
        };

        let grant = LoginGrant {
            token: Token::new(data.token),
            openid: data.profile.openid.clone(),
            user_info: data.profile,
        };
        Ok(self.context.session.establish(grant)?)
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&Value>,
        body: Option<&Value>,
        auth: Auth,
    ) -> ClientResult<Value> {
        let token = match auth {
            Auth::Session => self.context.bearer_token(),
            Auth::Anonymous => None,
        };
        let url = self.to_absolute_url(path);
        debug!(method = %method, url = %url, has_token = token.is_some(), "sending request");

        let mut request = self
            .http
            .request(method, url.as_str())
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &token {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(query) = query {
            request = request.query(&query_pairs(query));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        read_json(url, response).await
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    #[serde(default)]
    token: String,
    #[serde(flatten)]
    profile: UserInfo,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Flatten a JSON object into query pairs. Nulls are skipped; nested values
/// are sent as JSON text.
pub(crate) fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(object) = params.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

async fn read_json(url: String, response: Response) -> ClientResult<Value> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
    let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(&bytes)
    };

    if !status.is_success() {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(Value::as_object)
            .and_then(failure_message)
            .or_else(|| {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                (!text.is_empty()).then_some(text)
            });
        return Err(ClientError::Status {
            url,
            status: status.as_u16(),
            message,
        });
    }

    parsed.map_err(|source| ClientError::Decode { url, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_flattens_scalars_and_skips_nulls() {
        let pairs = query_pairs(&json!({
            "pageNum": 1,
            "status": "open",
            "skip": null,
            "ids": [1, 2]
        }));
        assert!(pairs.contains(&("pageNum".to_string(), "1".to_string())));
        assert!(pairs.contains(&("status".to_string(), "open".to_string())));
        assert!(pairs.contains(&("ids".to_string(), "[1,2]".to_string())));
        assert_eq!(pairs.len(), 3);
        assert!(query_pairs(&json!("scalar")).is_empty());
    }

    #[test]
    fn login_data_reads_flat_profile() -> Result<(), serde_json::Error> {
        let data: LoginData = serde_json::from_value(json!({
            "token": "abc",
            "openid": "o-1",
            "userId": 9,
            "role": "worker",
            "enabled": "1"
        }))?;
        assert_eq!(data.token, "abc");
        assert_eq!(data.profile.user_id, "9");
        assert_eq!(data.profile.openid, "o-1");
        assert_eq!(data.profile.role.as_deref(), Some("worker"));
        Ok(())
    }
}

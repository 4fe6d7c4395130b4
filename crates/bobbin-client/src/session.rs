//! Authentication session lifecycle.
//!
//! # Design
//! - The persisted session is four keys written together at login and
//!   removed together on logout or invalidity; never partially.
//! - `token` and `openid` are obfuscated at rest (see [`crate::codec`]);
//!   `userInfo` is stored as a plain object.
//! - A session is usable only while `now < tokenExpireTime`. [`SessionStore::check`]
//!   evicts on any other combination and reports why; navigating away is left
//!   to the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::codec;
use crate::host::Clock;
use crate::storage::{KeyValueStore, StorageResult};

/// Storage key holding the obfuscated token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the expiry in epoch milliseconds.
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpireTime";
/// Storage key holding the obfuscated openid.
pub const OPENID_KEY: &str = "openid";
/// Storage key holding the plaintext user profile.
pub const USER_INFO_KEY: &str = "userInfo";
/// Every key owned by the session, in write order.
pub const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, TOKEN_EXPIRY_KEY, OPENID_KEY, USER_INFO_KEY];

/// Lifetime of a freshly issued token (7 days).
pub const TOKEN_VALIDITY_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Bearer token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Token(***)")
    }
}

/// Profile returned by the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Backend user identifier.
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    /// Platform open identifier.
    #[serde(default)]
    pub openid: String,
    /// Role name assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Account enablement flag, as the backend encodes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Credentials handed to [`SessionStore::establish`] after a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginGrant {
    /// Issued bearer token.
    pub token: Token,
    /// Platform open identifier.
    pub openid: String,
    /// Profile to persist alongside the token.
    pub user_info: UserInfo,
}

/// A stored, valid session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Bearer token.
    pub token: Token,
    /// Expiry in epoch milliseconds.
    pub expires_at_ms: i64,
    /// Platform open identifier.
    pub openid: String,
    /// Stored profile.
    pub user_info: UserInfo,
}

/// Observable session states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing usable is stored.
    Absent,
    /// Token present and not yet expired.
    Valid,
    /// Token present but past its expiry.
    Expired,
}

/// Why a session could not be used.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionInvalid {
    /// Token or expiry missing.
    #[error("no session is stored")]
    Absent,
    /// Expiry reached.
    #[error("session has expired")]
    Expired,
    /// Stored values could not be read or decoded.
    #[error("stored session is corrupt")]
    Corrupt,
}

/// Owner of the persisted session and its in-memory mirror.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    transient: Mutex<HashMap<String, Value>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionStore")
            .field("transient_keys", &self.lock_transient().len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store over the host storage and clock.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            transient: Mutex::new(HashMap::new()),
        }
    }

    /// Persist a new session valid for [`TOKEN_VALIDITY_MS`] and mirror the
    /// plaintext values into the transient map.
    ///
    /// # Errors
    ///
    /// Returns an error if any key cannot be written; keys written before the
    /// failure are evicted again so the session is never partially stored.
    pub fn establish(&self, grant: LoginGrant) -> StorageResult<Session> {
        let expires_at_ms = self.clock.now_ms().saturating_add(TOKEN_VALIDITY_MS);
        let user_info = serde_json::to_value(&grant.user_info).unwrap_or(Value::Null);

        if let Err(err) = self.write_all(&grant, expires_at_ms, &user_info) {
            warn!(error = %err, "failed to persist session; rolling back");
            self.evict_storage();
            return Err(err);
        }

        {
            let mut transient = self.lock_transient();
            transient.insert(TOKEN_KEY.to_string(), Value::from(grant.token.as_str()));
            transient.insert(OPENID_KEY.to_string(), Value::from(grant.openid.as_str()));
            transient.insert(USER_INFO_KEY.to_string(), user_info);
        }
        info!(openid = %grant.openid, expires_at_ms, "session established");

        Ok(Session {
            token: grant.token,
            expires_at_ms,
            openid: grant.openid,
            user_info: grant.user_info,
        })
    }

    fn write_all(&self, grant: &LoginGrant, expires_at_ms: i64, user_info: &Value) -> StorageResult<()> {
        self.storage
            .set(TOKEN_KEY, Value::from(codec::encode(grant.token.as_str())))?;
        self.storage.set(TOKEN_EXPIRY_KEY, Value::from(expires_at_ms))?;
        self.storage
            .set(OPENID_KEY, Value::from(codec::encode(&grant.openid)))?;
        self.storage.set(USER_INFO_KEY, user_info.clone())
    }

    /// Inspect the session without side effects.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.read_token() {
            Ok(_) => SessionState::Valid,
            Err(SessionInvalid::Expired) => SessionState::Expired,
            Err(SessionInvalid::Absent | SessionInvalid::Corrupt) => SessionState::Absent,
        }
    }

    /// Return the current token if the session is valid.
    ///
    /// # Errors
    ///
    /// Returns the reason the session is unusable. Before returning, every
    /// session key is evicted from storage and from the transient map.
    pub fn check(&self) -> Result<Token, SessionInvalid> {
        self.read_token().map_err(|reason| {
            warn!(%reason, "session invalid; evicting stored credentials");
            self.evict();
            reason
        })
    }

    /// Current session with its decoded values, if valid. Does not evict.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        let token = self.read_token().ok()?;
        let expires_at_ms = self
            .read_key(TOKEN_EXPIRY_KEY)
            .ok()
            .flatten()
            .as_ref()
            .and_then(expiry_ms)?;
        Some(Session {
            token,
            expires_at_ms,
            openid: self.openid().unwrap_or_default(),
            user_info: self.user_info()?,
        })
    }

    /// Explicit logout; same eviction as an invalid session.
    pub fn logout(&self) {
        info!("session logout requested");
        self.evict();
    }

    /// Decoded openid, preferring the in-memory mirror.
    #[must_use]
    pub fn openid(&self) -> Option<String> {
        if let Some(Value::String(openid)) = self.lock_transient().get(OPENID_KEY) {
            return Some(openid.clone());
        }
        match self.read_key(OPENID_KEY).ok().flatten()? {
            Value::String(encoded) if !encoded.is_empty() => codec::decode(&encoded).ok(),
            _ => None,
        }
    }

    /// Stored user profile, preferring the in-memory mirror.
    #[must_use]
    pub fn user_info(&self) -> Option<UserInfo> {
        let mirrored = self.lock_transient().get(USER_INFO_KEY).cloned();
        let value = match mirrored {
            Some(value) => value,
            None => self.read_key(USER_INFO_KEY).ok().flatten()?,
        };
        serde_json::from_value(value).ok()
    }

    /// Store a value in the transient, process-local map.
    pub fn set_temporary(&self, key: impl Into<String>, value: Value) {
        self.lock_transient().insert(key.into(), value);
    }

    /// Read a value from the transient map.
    #[must_use]
    pub fn temporary(&self, key: &str) -> Option<Value> {
        self.lock_transient().get(key).cloned()
    }

    fn read_token(&self) -> Result<Token, SessionInvalid> {
        let stored = self.read_key(TOKEN_KEY).map_err(|_| SessionInvalid::Corrupt)?;
        let expiry = self
            .read_key(TOKEN_EXPIRY_KEY)
            .map_err(|_| SessionInvalid::Corrupt)?;
        let (Some(stored), Some(expiry)) = (stored, expiry) else {
            return Err(SessionInvalid::Absent);
        };
        if is_blank(&stored) || is_blank(&expiry) {
            return Err(SessionInvalid::Absent);
        }

        let expires_at_ms = expiry_ms(&expiry).ok_or(SessionInvalid::Corrupt)?;
        if self.clock.now_ms() >= expires_at_ms {
            return Err(SessionInvalid::Expired);
        }

        let Value::String(encoded) = stored else {
            return Err(SessionInvalid::Corrupt);
        };
        let token = match codec::decode(&encoded) {
            Ok(token) if !token.is_empty() => Token(token),
            _ => return Err(SessionInvalid::Corrupt),
        };

        // openid is optional, but when stored it must decode like the token.
        match self.read_key(OPENID_KEY).map_err(|_| SessionInvalid::Corrupt)? {
            None | Some(Value::Null) => {}
            Some(Value::String(openid)) if openid.is_empty() || codec::decode(&openid).is_ok() => {}
            Some(_) => return Err(SessionInvalid::Corrupt),
        }
        Ok(token)
    }

    fn read_key(&self, key: &str) -> StorageResult<Option<Value>> {
        self.storage.get(key).inspect_err(|err| {
            warn!(key, error = %err, "session storage read failed");
        })
    }

    fn evict(&self) {
        self.evict_storage();
        let mut transient = self.lock_transient();
        for key in [TOKEN_KEY, OPENID_KEY, USER_INFO_KEY] {
            transient.remove(key);
        }
    }

    fn evict_storage(&self) {
        for key in SESSION_KEYS {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, error = %err, "failed to evict session key");
            }
        }
    }

    fn lock_transient(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.transient
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// Expiry stored either as a JSON number or a numeric string.
#[allow(clippy::cast_possible_truncation)]
fn expiry_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|ms| ms as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Session and request layer for the Bobbin factory client.
//!
//! Layout:
//! - `address.rs`: base URL resolution and absolute URL building
//! - `codec.rs`: reversible at-rest obfuscation for session values
//! - `storage.rs`: key-value storage capability and an in-memory store
//! - `host.rs`: presentation, navigation and clock capabilities
//! - `session.rs`: token lifecycle (login, validity check, eviction)
//! - `envelope.rs`: batch endpoint request/response shapes
//! - `pagination.rs`: list extraction and the normalized `Page`
//! - `facade.rs`: the request facade every caller goes through
//! - `upload.rs`: multipart image upload
//! - `launch.rs`: launch routing and the route guard

pub mod address;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod host;
pub mod launch;
pub mod pagination;
pub mod session;
pub mod storage;
pub mod upload;

pub use address::{BaseUrl, BaseUrlSources, resolve_base_url};
pub use envelope::{Action, BATCH_PATH, BatchResponse, RequestEnvelope};
pub use error::{ClientError, ClientResult};
pub use facade::{ClientContext, LOGIN_PATH, RequestFacade};
pub use host::{
    Clock, HOME_ROUTE, LOGIN_ROUTE, NavigationError, Navigator, Presenter, SystemClock,
};
pub use launch::{
    BuildProfile, Environment, GuardOutcome, LaunchConfig, LaunchOutcome, guard, launch,
};
pub use pagination::{Page, PageMethod, PageOptions, ParamType};
pub use session::{LoginGrant, Session, SessionInvalid, SessionState, SessionStore, Token, UserInfo};
pub use storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};
pub use upload::{UploadOptions, UploadReceipt};

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

//! Logging and span-context helpers shared by the Bobbin binaries.
//!
//! Layout: init.rs (subscriber setup), context.rs (invocation spans and
//! request identifiers), error.rs (typed failures).

pub mod context;
pub mod error;
pub mod init;

pub use context::{GlobalContextGuard, current_request_id, with_request_context};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};

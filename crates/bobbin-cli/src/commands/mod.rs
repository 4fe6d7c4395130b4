//! Command handlers grouped by concern.

pub(crate) mod data;
pub(crate) mod launch;
pub(crate) mod session;
pub(crate) mod upload;

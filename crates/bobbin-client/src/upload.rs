//! Multipart image upload.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{SUCCESS_CODE, failure_message};
use crate::error::{ClientError, ClientResult};
use crate::facade::{LoadingGuard, RequestFacade};

/// Default upload endpoint.
pub const UPLOAD_PATH: &str = "/api/upload";

const UPLOADING_TITLE: &str = "上传中...";
const UPLOAD_SUCCESS_MESSAGE: &str = "上传成功";
const UPLOAD_FAILURE_MESSAGE: &str = "上传失败";
const UPLOAD_PARSE_FAILURE_MESSAGE: &str = "解析响应失败";

/// Options for [`RequestFacade::upload_image`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    /// Upload endpoint, relative or absolute.
    pub url: String,
    /// Multipart field carrying the file.
    pub field_name: String,
    /// Extra text fields sent with the file.
    pub form_data: BTreeMap<String, String>,
    /// Whether to show the loading indicator.
    pub show_loading: bool,
    /// Whether to attach the session token.
    pub need_token: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            url: UPLOAD_PATH.to_string(),
            field_name: "file".to_string(),
            form_data: BTreeMap::new(),
            show_loading: true,
            need_token: true,
        }
    }
}

/// Successful upload result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Always 200.
    pub code: i64,
    /// Public URL of the stored image.
    pub url: String,
    /// Confirmation message.
    pub message: String,
}

impl RequestFacade {
    /// Upload the file at `file_path`.
    ///
    /// Resolves when the server answers `code == 200` with a non-empty
    /// `data.url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::File`] if the file cannot be read,
    /// [`ClientError::Transport`] if the call fails, and
    /// [`ClientError::Upload`] carrying the server message (or a fallback)
    /// when the server refuses or the body cannot be parsed.
    pub async fn upload_image(
        &self,
        file_path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> ClientResult<UploadReceipt> {
        let presenter = self.context().presenter.as_ref();
        let loading = options
            .show_loading
            .then(|| LoadingGuard::show(presenter, UPLOADING_TITLE));
        let outcome = self.send_upload(file_path.as_ref(), options).await;
        drop(loading);
        outcome
    }

    async fn send_upload(&self, path: &Path, options: &UploadOptions) -> ClientResult<UploadReceipt> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::File {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());

        let mut form = Form::new().part(options.field_name.clone(), Part::bytes(bytes).file_name(file_name));
        for (key, value) in &options.form_data {
            form = form.text(key.clone(), value.clone());
        }

        let token = if options.need_token {
            self.context().bearer_token()
        } else {
            None
        };
        let url = self.to_absolute_url(&options.url);
        debug!(url = %url, has_token = token.is_some(), "uploading file");

        let mut request = self.http().post(url.as_str());
        if let Some(token) = &token {
            request = request.bearer_auth(token.as_str());
        }
        let response = request
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        let text = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { url, source })?;
        parse_receipt(&text)
    }
}

fn parse_receipt(text: &str) -> ClientResult<UploadReceipt> {
    let body: Value = serde_json::from_str(text).map_err(|err| {
        warn!(error = %err, "upload response was not JSON");
        ClientError::Upload {
            message: UPLOAD_PARSE_FAILURE_MESSAGE.to_string(),
        }
    })?;

    let code = body.get("code").and_then(Value::as_i64);
    let url = body
        .get("data")
        .and_then(|data| data.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty());
    match (code, url) {
        (Some(SUCCESS_CODE), Some(url)) => Ok(UploadReceipt {
            code: SUCCESS_CODE,
            url: url.to_string(),
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        }),
        _ => Err(ClientError::Upload {
            message: body
                .as_object()
                .and_then(failure_message)
                .unwrap_or_else(|| UPLOAD_FAILURE_MESSAGE.to_string()),
        }),
    }
}

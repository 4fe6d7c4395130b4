//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use bobbin_client::{BatchResponse, LaunchOutcome, Page, SessionState, UploadReceipt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

/// Session summary printed by `status` and `login`.
#[derive(Debug, Serialize)]
pub(crate) struct SessionReport {
    pub(crate) state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) openid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) expires_at: Option<String>,
    pub(crate) state_file: String,
}

/// Where a launch or guard check left the client.
#[derive(Debug, Serialize)]
pub(crate) struct RouteReport {
    pub(crate) outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) navigation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) route: Option<String>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_session(report: &SessionReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("session: {}", report.state);
            if let Some(user_id) = &report.user_id {
                println!("user: {user_id}");
            }
            if let Some(openid) = &report.openid {
                println!("openid: {openid}");
            }
            if let Some(role) = &report.role {
                println!("role: {role}");
            }
            if let Some(expires_at) = &report.expires_at {
                println!("expires: {expires_at}");
            }
            println!("state file: {}", report.state_file);
        }
    }
    Ok(())
}

pub(crate) fn render_page(page: &Page, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(page)?,
        OutputFormat::Table => {
            println!("{:>5} RECORD", "#");
            for (index, record) in page.data.iter().enumerate() {
                println!("{:>5} {}", index + 1, record);
            }
            println!("total: {} (showing {})", page.total, page.data.len());
        }
    }
    Ok(())
}

pub(crate) fn render_value(value: &Value, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            println!("{value}");
            Ok(())
        }
    }
}

pub(crate) fn render_batch(response: &BatchResponse, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "code": response.code,
            "success": response.is_success(),
            "message": response.message,
            "data": response.data,
        })),
        OutputFormat::Table => {
            if let Some(code) = response.code {
                println!("code: {code}");
            }
            if let Some(message) = &response.message {
                println!("message: {message}");
            }
            match &response.data {
                Value::Array(records) => {
                    for record in records {
                        println!("  {record}");
                    }
                    println!("records: {}", records.len());
                }
                Value::Null => {}
                other => println!("data: {other}"),
            }
            Ok(())
        }
    }
}

pub(crate) fn render_receipt(receipt: &UploadReceipt, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(receipt)?,
        OutputFormat::Table => {
            println!("{}", receipt.message);
            println!("url: {}", receipt.url);
        }
    }
    Ok(())
}

pub(crate) fn render_route(report: &RouteReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => match (&report.navigation, &report.route) {
            (Some(kind), Some(route)) => println!("{}: {kind} {route}", report.outcome),
            _ => println!("{}", report.outcome),
        },
    }
    Ok(())
}

#[must_use]
pub(crate) const fn session_state_to_str(state: SessionState) -> &'static str {
    match state {
        SessionState::Absent => "absent",
        SessionState::Valid => "valid",
        SessionState::Expired => "expired",
    }
}

#[must_use]
pub(crate) const fn launch_outcome_to_str(outcome: LaunchOutcome) -> &'static str {
    match outcome {
        LaunchOutcome::Home => "home",
        LaunchOutcome::HomeRelaunched => "home (relaunched)",
        LaunchOutcome::Login => "login",
        LaunchOutcome::Stranded => "stranded",
    }
}

/// Render epoch milliseconds as RFC 3339, falling back to the raw number.
#[must_use]
pub(crate) fn format_epoch_ms(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map_or_else(|| epoch_ms.to_string(), |instant| instant.to_rfc3339())
}

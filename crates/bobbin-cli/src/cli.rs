//! Argument parsing and command dispatch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bobbin_client::upload::UPLOAD_PATH;
use bobbin_client::{Action, BuildProfile, Environment, PageMethod, ParamType};
use bobbin_telemetry::{
    DEFAULT_LOG_LEVEL, GlobalContextGuard, LogFormat, LoggingConfig, init_logging,
    with_request_context,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliDependencies, CliError, CliResult, parse_url};
use crate::commands::data::{handle_batch, handle_list, handle_request};
use crate::commands::launch::{handle_guard, handle_launch};
use crate::commands::session::{handle_login, handle_logout, handle_status};
use crate::commands::upload::handle_upload;
use crate::store::DEFAULT_STATE_FILE;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let _span = GlobalContextGuard::new(command_label(&cli.command));
    let request_id = Uuid::new_v4().to_string();
    let result = with_request_context(request_id.clone(), dispatch(cli, &request_id)).await;

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, request_id: &str) -> CliResult<()> {
    let deps = CliDependencies::new(cli.timeout, request_id)?;
    let ctx = AppContext::from_options(&deps, cli.api_url.as_ref(), cli.state_file);
    let format = cli.output;

    match cli.command {
        Command::Login(args) => handle_login(&ctx, args, format).await,
        Command::Logout => handle_logout(&ctx),
        Command::Status => handle_status(&ctx, format),
        Command::Request(request) => handle_request(&ctx, request, format).await,
        Command::List(args) => handle_list(&ctx, args, format).await,
        Command::Batch(args) => handle_batch(&ctx, args, format).await,
        Command::Upload(args) => handle_upload(&ctx, args, format).await,
        Command::Launch(args) => handle_launch(&ctx, args, format).await,
        Command::Guard(args) => handle_guard(&ctx, &args, format),
    }
}

#[derive(Parser)]
#[command(name = "bobbin", about = "Session-aware client for the garment-factory API")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "BOBBIN_API_URL", value_parser = parse_url)]
    pub(crate) api_url: Option<Url>,
    #[arg(
        long,
        global = true,
        env = "BOBBIN_STATE_FILE",
        default_value = DEFAULT_STATE_FILE
    )]
    pub(crate) state_file: PathBuf,
    #[arg(
        long,
        global = true,
        env = "BOBBIN_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "BOBBIN_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(long, global = true, value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Exchange a platform login code for a session.
    Login(LoginArgs),
    /// Clear the stored session.
    Logout,
    /// Show the stored session.
    Status,
    /// Send a raw request through the facade.
    #[command(subcommand)]
    Request(RequestCommand),
    /// Fetch one page of a list endpoint.
    List(ListArgs),
    /// Send an entity operation to the batch endpoint.
    Batch(BatchArgs),
    /// Upload an image.
    Upload(UploadArgs),
    /// Run the launch routing flow.
    Launch(LaunchArgs),
    /// Check whether a page may render.
    Guard(GuardArgs),
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, help = "Login code issued by the platform")]
    pub(crate) code: String,
}

#[derive(Subcommand)]
pub(crate) enum RequestCommand {
    Get(QueryArgs),
    Delete(QueryArgs),
    Post(BodyArgs),
    Put(BodyArgs),
}

#[derive(Args)]
pub(crate) struct QueryArgs {
    #[arg(help = "Path relative to the API base, or an absolute URL")]
    pub(crate) path: String,
    #[arg(long, value_parser = parse_json, help = "Query parameters as a JSON object")]
    pub(crate) params: Option<Value>,
}

#[derive(Args)]
pub(crate) struct BodyArgs {
    #[arg(help = "Path relative to the API base, or an absolute URL")]
    pub(crate) path: String,
    #[arg(long, value_parser = parse_json, help = "JSON body (defaults to {})")]
    pub(crate) body: Option<Value>,
}

#[derive(Args)]
pub(crate) struct ListArgs {
    #[arg(help = "List endpoint path")]
    pub(crate) path: String,
    #[arg(long, value_parser = parse_json, default_value = "{}")]
    pub(crate) params: Value,
    #[arg(long, value_enum, default_value_t = PageMethodArg::Post)]
    pub(crate) method: PageMethodArg,
    #[arg(long, value_enum, default_value_t = ParamTypeArg::Body)]
    pub(crate) param_type: ParamTypeArg,
    #[arg(long, default_value = "data")]
    pub(crate) data_field: String,
    #[arg(long, default_value = "total")]
    pub(crate) total_field: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum PageMethodArg {
    Get,
    Post,
}

impl From<PageMethodArg> for PageMethod {
    fn from(value: PageMethodArg) -> Self {
        match value {
            PageMethodArg::Get => Self::Get,
            PageMethodArg::Post => Self::Post,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum ParamTypeArg {
    Params,
    Body,
}

impl From<ParamTypeArg> for ParamType {
    fn from(value: ParamTypeArg) -> Self {
        match value {
            ParamTypeArg::Params => Self::Params,
            ParamTypeArg::Body => Self::Body,
        }
    }
}

#[derive(Args)]
pub(crate) struct BatchArgs {
    #[arg(help = "Entity name, e.g. order or work_order")]
    pub(crate) entity: String,
    #[arg(value_enum)]
    pub(crate) action: ActionArg,
    #[arg(long)]
    pub(crate) id: Option<String>,
    #[arg(long, value_parser = parse_json)]
    pub(crate) data: Option<Value>,
    #[arg(long, value_parser = parse_json)]
    pub(crate) conditions: Option<Value>,
    #[arg(long, value_delimiter = ',', help = "Related entities to load")]
    pub(crate) fetch: Vec<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum ActionArg {
    Create,
    Query,
    Update,
    Delete,
}

impl From<ActionArg> for Action {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Create => Self::Create,
            ActionArg::Query => Self::Query,
            ActionArg::Update => Self::Update,
            ActionArg::Delete => Self::Delete,
        }
    }
}

#[derive(Args)]
pub(crate) struct UploadArgs {
    #[arg(help = "Image file to upload")]
    pub(crate) file: PathBuf,
    #[arg(long, default_value = UPLOAD_PATH)]
    pub(crate) url: String,
    #[arg(long, default_value = "file")]
    pub(crate) field_name: String,
    #[arg(
        long = "field",
        value_parser = parse_form_field,
        help = "Extra form field as key=value; repeatable"
    )]
    pub(crate) fields: Vec<(String, String)>,
    #[arg(long, help = "Send without the session token")]
    pub(crate) anonymous: bool,
    #[arg(long, help = "Skip the loading indicator")]
    pub(crate) quiet: bool,
}

impl UploadArgs {
    pub(crate) fn form_data(&self) -> BTreeMap<String, String> {
        self.fields.iter().cloned().collect()
    }
}

#[derive(Args)]
pub(crate) struct LaunchArgs {
    #[arg(long, value_enum, default_value_t = EnvironmentArg::MiniProgram)]
    pub(crate) environment: EnvironmentArg,
    #[arg(long, value_enum, default_value_t = ProfileArg::Development)]
    pub(crate) profile: ProfileArg,
    #[arg(
        long,
        value_parser = parse_url,
        help = "Service address for production mini-program builds"
    )]
    pub(crate) production_url: Option<Url>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum EnvironmentArg {
    MiniProgram,
    H5,
}

impl From<EnvironmentArg> for Environment {
    fn from(value: EnvironmentArg) -> Self {
        match value {
            EnvironmentArg::MiniProgram => Self::MiniProgram,
            EnvironmentArg::H5 => Self::H5,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum ProfileArg {
    Development,
    Production,
}

impl From<ProfileArg> for BuildProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Development => Self::Development,
            ProfileArg::Production => Self::Production,
        }
    }
}

#[derive(Args)]
pub(crate) struct GuardArgs {
    #[arg(help = "Route of the page about to render")]
    pub(crate) route: String,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Status => "status",
        Command::Request(RequestCommand::Get(_)) => "request_get",
        Command::Request(RequestCommand::Delete(_)) => "request_delete",
        Command::Request(RequestCommand::Post(_)) => "request_post",
        Command::Request(RequestCommand::Put(_)) => "request_put",
        Command::List(_) => "list",
        Command::Batch(_) => "batch",
        Command::Upload(_) => "upload",
        Command::Launch(_) => "launch",
        Command::Guard(_) => "guard",
    }
}

fn parse_json(input: &str) -> Result<Value, String> {
    serde_json::from_str(input).map_err(|err| format!("invalid JSON '{input}': {err}"))
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse().map_err(|err: bobbin_telemetry::TelemetryError| err.to_string())
}

fn parse_form_field(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("form field '{input}' must be key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("form field '{input}' has an empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Reject a JSON flag that must be an object.
pub(crate) fn require_object(name: &str, value: &Value) -> CliResult<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(CliError::validation(format!("--{name} must be a JSON object")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_with_defaults() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["bobbin", "status"])?;
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(matches!(cli.output, OutputFormat::Table));
        assert!(matches!(cli.command, Command::Status));
        Ok(())
    }

    #[test]
    fn list_arguments_map_to_page_options() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "bobbin",
            "list",
            "/api/orders/page",
            "--params",
            r#"{"pageNum":1}"#,
            "--method",
            "get",
            "--total-field",
            "count",
            "--output",
            "json",
        ])?;
        let Command::List(args) = cli.command else {
            anyhow::bail!("expected list command");
        };
        assert_eq!(PageMethod::from(args.method), PageMethod::Get);
        assert_eq!(ParamType::from(args.param_type), ParamType::Body);
        assert_eq!(args.params["pageNum"], 1);
        assert_eq!(args.total_field, "count");
        assert!(matches!(cli.output, OutputFormat::Json));
        Ok(())
    }

    #[test]
    fn batch_fetch_is_comma_separated() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "bobbin",
            "batch",
            "order",
            "query",
            "--fetch",
            "customer,style",
        ])?;
        let Command::Batch(args) = cli.command else {
            anyhow::bail!("expected batch command");
        };
        assert_eq!(args.fetch, vec!["customer".to_string(), "style".to_string()]);
        assert_eq!(Action::from(args.action), Action::Query);
        Ok(())
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(Cli::try_parse_from(["bobbin", "list", "/x", "--params", "{oops"]).is_err());
        assert!(Cli::try_parse_from(["bobbin", "--api-url", "ftp://x", "status"]).is_err());
        assert!(Cli::try_parse_from(["bobbin", "--log-format", "xml", "status"]).is_err());
        assert!(parse_form_field("novalue").is_err());
        assert!(parse_form_field("=x").is_err());
        assert_eq!(
            parse_form_field("orderId=42").ok(),
            Some(("orderId".to_string(), "42".to_string()))
        );
    }
}

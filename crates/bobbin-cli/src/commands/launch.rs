use bobbin_client::{GuardOutcome, LaunchConfig, guard, launch};

use crate::cli::{GuardArgs, LaunchArgs, OutputFormat};
use crate::client::{AppContext, CliResult};
use crate::output::{RouteReport, launch_outcome_to_str, render_route};

pub(crate) async fn handle_launch(
    ctx: &AppContext,
    args: LaunchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let config = LaunchConfig {
        environment: args.environment.into(),
        profile: args.profile.into(),
        production_base_url: args.production_url.map(|url| url.to_string()),
        ..LaunchConfig::default()
    };
    let outcome = launch(ctx.facade.context(), &config).await;
    render_route(
        &route_report(ctx, launch_outcome_to_str(outcome)),
        format,
    )
}

pub(crate) fn handle_guard(ctx: &AppContext, args: &GuardArgs, format: OutputFormat) -> CliResult<()> {
    let outcome = match guard(ctx.facade.context(), &args.route) {
        GuardOutcome::Allowed => "allowed",
        GuardOutcome::OnLoginPage => "on login page",
        GuardOutcome::Redirected => "redirected",
    };
    render_route(&route_report(ctx, outcome), format)
}

fn route_report(ctx: &AppContext, outcome: &'static str) -> RouteReport {
    let current = ctx.navigator.current();
    RouteReport {
        outcome,
        navigation: current.as_ref().map(|(change, _)| change.as_str()),
        route: current.map(|(_, route)| route),
    }
}

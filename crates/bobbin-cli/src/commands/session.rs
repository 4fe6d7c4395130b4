use bobbin_client::{Session, SessionState};

use crate::cli::{LoginArgs, OutputFormat};
use crate::client::{AppContext, CliResult};
use crate::output::{SessionReport, format_epoch_ms, render_session, session_state_to_str};

pub(crate) async fn handle_login(
    ctx: &AppContext,
    args: LoginArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let session = ctx.facade.login_with_code(&args.code).await?;
    render_session(&report(ctx, SessionState::Valid, Some(&session)), format)
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    ctx.facade.session().logout();
    println!("Session cleared.");
    Ok(())
}

pub(crate) fn handle_status(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let store = ctx.facade.session();
    let state = store.state();
    let session = store.current();
    render_session(&report(ctx, state, session.as_ref()), format)
}

fn report(ctx: &AppContext, state: SessionState, session: Option<&Session>) -> SessionReport {
    SessionReport {
        state: session_state_to_str(state),
        user_id: session.map(|session| session.user_info.user_id.clone()),
        openid: session.map(|session| session.openid.clone()),
        role: session.and_then(|session| session.user_info.role.clone()),
        expires_at: session.map(|session| format_epoch_ms(session.expires_at_ms)),
        state_file: ctx.state_file.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use bobbin_client::HOME_ROUTE;
    use bobbin_client::session::SESSION_KEYS;
    use httpmock::prelude::*;
    use serde_json::{Value, json};

    use crate::client::CliError;
    use crate::commands::test_support::{context_for, logged_in};
    use crate::host::RouteChange;

    fn stored_keys(ctx: &AppContext) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(&ctx.state_file)?;
        let value: Value = serde_json::from_str(&text)?;
        Ok(value
            .as_object()
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default())
    }

    #[tokio::test]
    async fn login_persists_session_to_state_file() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/wechat/openid")
                .json_body(json!({"code": "wx-1"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "code": 200,
                    "data": {"token": "t-1", "openid": "o-1", "userId": 1, "role": "manager"}
                }));
        });
        let dir = tempfile::tempdir()?;
        let ctx = context_for(&server, dir.path());

        handle_login(
            &ctx,
            LoginArgs {
                code: "wx-1".to_string(),
            },
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        mock.assert();
        let mut keys = stored_keys(&ctx)?;
        keys.sort();
        let mut expected: Vec<String> = SESSION_KEYS.iter().map(ToString::to_string).collect();
        expected.sort();
        assert_eq!(keys, expected);
        assert!(!std::fs::read_to_string(&ctx.state_file)?.contains("t-1"));
        assert_eq!(ctx.facade.session().state(), SessionState::Valid);
        assert_eq!(
            ctx.navigator.current(),
            Some((RouteChange::SwitchTab, HOME_ROUTE.to_string()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn refused_login_is_a_validation_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/wechat/openid");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"code": 403, "msg": "未授权的账号"}));
        });
        let dir = tempfile::tempdir()?;
        let ctx = context_for(&server, dir.path());

        let err = handle_login(
            &ctx,
            LoginArgs {
                code: "wx-1".to_string(),
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("refused login should fail");
        assert!(matches!(&err, CliError::Validation(message) if message == "未授权的账号"));
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_stored_keys() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        let ctx = context_for(&server, dir.path());
        logged_in(&ctx, "t-2")?;
        assert_eq!(stored_keys(&ctx)?.len(), SESSION_KEYS.len());

        handle_logout(&ctx).map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert!(stored_keys(&ctx)?.is_empty());
        assert!(handle_status(&ctx, OutputFormat::Table).is_ok());
        assert_eq!(ctx.facade.session().state(), SessionState::Absent);
        Ok(())
    }
}

use bobbin_client::session::{SESSION_KEYS, TOKEN_VALIDITY_MS};
use bobbin_client::{
    Action, ClientError, HOME_ROUTE, LOGIN_ROUTE, PageMethod, PageOptions, ParamType,
    RequestEnvelope, SessionState,
};
use bobbin_test_support::fakes::NavigationKind;
use bobbin_test_support::fixtures::{Harness, NOW_MS};
use httpmock::prelude::*;
use serde_json::json;

#[tokio::test]
async fn get_attaches_bearer_after_login() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/orders")
            .query_param("status", "open")
            .header("authorization", "Bearer abc");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200, "data": []}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let body = harness
        .facade
        .get("/api/orders", Some(&json!({"status": "open"})))
        .await?;

    mock.assert();
    assert_eq!(body["code"], 200);
    assert!(harness.navigator.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn expired_session_is_evicted_and_call_goes_out_anonymous() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/orders/search")
            .header_missing("authorization");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    harness.clock.set(NOW_MS + TOKEN_VALIDITY_MS);
    assert_eq!(harness.facade.session().state(), SessionState::Expired);

    harness.facade.post("/api/orders/search", None).await?;

    mock.assert();
    for key in SESSION_KEYS {
        assert!(!harness.storage.contains(key), "{key} should be evicted");
    }
    assert_eq!(
        harness.navigator.count(NavigationKind::Relaunch, LOGIN_ROUTE),
        1
    );
    assert_eq!(harness.facade.session().state(), SessionState::Absent);
    Ok(())
}

#[tokio::test]
async fn session_valid_until_last_millisecond() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/api/orders/7")
            .header("authorization", "Bearer abc");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    harness.clock.advance(TOKEN_VALIDITY_MS - 1);
    harness.facade.delete("/api/orders/7", None).await?;

    mock.assert();
    assert!(harness.navigator.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn put_sends_json_body() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/styles/3")
            .header("content-type", "application/json")
            .json_body(json!({"name": "衬衫"}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200, "data": {"id": 3}}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let body = harness
        .facade
        .put("/api/styles/3", Some(&json!({"name": "衬衫"})))
        .await?;

    mock.assert();
    assert_eq!(body["data"]["id"], 3);
    Ok(())
}

#[tokio::test]
async fn set_base_url_redirects_relative_calls() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/ping");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"ok": true}));
    });

    let harness = Harness::new("https://unused.invalid");
    harness.facade.set_base_url(&format!("{}/", server.base_url()));
    assert_eq!(
        harness.facade.to_absolute_url("/x"),
        format!("{}/x", server.base_url())
    );
    assert_eq!(
        harness.facade.to_absolute_url("https://other.example.com/y"),
        "https://other.example.com/y"
    );

    harness.facade.get("/api/ping", None).await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn non_success_status_surfaces_backend_message() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/orders");
        then.status(500)
            .header("content-type", "application/json")
            .json_body(json!({"message": "数据库繁忙"}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let err = harness
        .facade
        .get("/api/orders", None)
        .await
        .expect_err("500 should fail");
    assert!(matches!(&err, ClientError::Status { status: 500, .. }));
    assert_eq!(err.user_message(), "数据库繁忙");
    Ok(())
}

#[tokio::test]
async fn paginated_request_balances_loading_on_success() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/orders/page")
            .json_body(json!({"pageNum": 1, "pageSize": 10}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "code": 200,
                "data": [{"id": 1}, {"id": 2}],
                "total": 12,
                "pageNum": 1
            }));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let page = harness
        .facade
        .request_with_loading_and_pagination(
            "/api/orders/page",
            &json!({"pageNum": 1, "pageSize": 10}),
            &PageOptions::default(),
        )
        .await?;

    mock.assert();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.total, 12);
    assert_eq!(page.rest.get("pageNum"), Some(&json!(1)));
    assert_eq!(harness.presenter.shown(), 1);
    assert_eq!(harness.presenter.hidden(), 1);
    assert!(harness.presenter.errors().is_empty());
    Ok(())
}

#[tokio::test]
async fn paginated_request_balances_loading_on_failure() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/orders/page");
        then.status(502).body("bad gateway");
    });

    let harness = Harness::new(&server.base_url());
    let outcome = harness
        .facade
        .request_with_loading_and_pagination(
            "/api/orders/page",
            &json!({}),
            &PageOptions::default(),
        )
        .await;

    assert!(matches!(outcome, Err(ClientError::Status { status: 502, .. })));
    assert_eq!(harness.presenter.shown(), 1);
    assert_eq!(harness.presenter.hidden(), 1);
    assert_eq!(harness.presenter.errors(), vec!["bad gateway".to_string()]);
    Ok(())
}

#[tokio::test]
async fn paginated_request_rejects_business_failure() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/orders/page");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 500, "message": "无权限访问"}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let outcome = harness
        .facade
        .request_with_loading_and_pagination(
            "/api/orders/page",
            &json!({}),
            &PageOptions::default(),
        )
        .await;

    assert!(matches!(outcome, Err(ClientError::Business { code: Some(500), .. })));
    assert_eq!(harness.presenter.errors(), vec!["无权限访问".to_string()]);
    assert_eq!(harness.presenter.hidden(), 1);
    Ok(())
}

#[tokio::test]
async fn paginated_request_reads_every_list_shape() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let shapes = [
        ("/shape/data", json!({"code": 200, "data": [{"id": 1}], "total": 1})),
        ("/shape/records", json!({"code": 200, "records": [{"id": 1}], "total": 1})),
        ("/shape/list", json!({"code": 200, "list": [{"id": 1}], "total": 1})),
        ("/shape/content", json!({"code": 200, "data": {"content": [{"id": 1}], "total": 1}})),
    ];
    for (path, body) in &shapes {
        let body = body.clone();
        server.mock(move |when, then| {
            when.method(GET).path(*path).query_param("page", "2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        });
    }

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let options = PageOptions {
        method: PageMethod::Get,
        ..PageOptions::default()
    };
    for (path, _) in &shapes {
        let page = harness
            .facade
            .request_with_loading_and_pagination(path, &json!({"page": 2}), &options)
            .await?;
        assert_eq!(page.data, vec![json!({"id": 1})], "shape {path}");
        assert_eq!(page.total, 1, "shape {path}");
    }
    assert_eq!(harness.presenter.shown(), shapes.len());
    assert_eq!(harness.presenter.hidden(), shapes.len());
    Ok(())
}

#[tokio::test]
async fn paginated_post_with_params_uses_query_string() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/workers/page")
            .query_param("pageNum", "3")
            .json_body(json!({}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200, "rows": [{"id": 9}], "count": "4"}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let options = PageOptions {
        method: PageMethod::Post,
        param_type: ParamType::Params,
        data_field: "rows".to_string(),
        total_field: "count".to_string(),
    };
    let page = harness
        .facade
        .request_with_loading_and_pagination("/api/workers/page", &json!({"pageNum": 3}), &options)
        .await?;

    mock.assert();
    assert_eq!(page.data, vec![json!({"id": 9})]);
    assert_eq!(page.total, 4);
    Ok(())
}

#[tokio::test]
async fn login_with_code_persists_session() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/wechat/openid")
            .header_missing("authorization")
            .json_body(json!({"code": "wx-code"}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "code": 200,
                "msg": "ok",
                "data": {
                    "token": "fresh-token",
                    "openid": "o-42",
                    "userId": 42,
                    "role": "worker",
                    "enabled": true
                }
            }));
    });

    let harness = Harness::new(&server.base_url());
    let session = harness.facade.login_with_code("wx-code").await?;

    mock.assert();
    assert_eq!(session.token.as_str(), "fresh-token");
    assert_eq!(session.expires_at_ms, NOW_MS + TOKEN_VALIDITY_MS);
    assert_eq!(session.user_info.user_id, "42");
    for key in SESSION_KEYS {
        assert!(harness.storage.contains(key), "{key} should be stored");
    }
    assert_eq!(harness.facade.session().openid().as_deref(), Some("o-42"));
    assert_eq!(harness.facade.session().state(), SessionState::Valid);
    assert_eq!(harness.presenter.successes(), vec!["登录成功".to_string()]);
    assert_eq!(
        harness.navigator.calls(),
        vec![(NavigationKind::SwitchTab, HOME_ROUTE.to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn login_relaunches_home_when_tab_switch_is_refused() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/wechat/openid");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200, "data": {"token": "t-1", "openid": "o-1", "userId": 1}}));
    });

    let harness = Harness::new(&server.base_url());
    harness.navigator.fail_next_switches(1);
    harness.facade.login_with_code("wx-code").await?;

    assert_eq!(harness.navigator.count(NavigationKind::SwitchTab, HOME_ROUTE), 1);
    assert_eq!(harness.navigator.count(NavigationKind::Relaunch, HOME_ROUTE), 1);
    assert_eq!(harness.facade.session().state(), SessionState::Valid);
    Ok(())
}

#[tokio::test]
async fn login_with_code_reports_refusal() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/wechat/openid");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 401, "msg": "账号已停用"}));
    });

    let harness = Harness::new(&server.base_url());
    let err = harness
        .facade
        .login_with_code("wx-code")
        .await
        .expect_err("refused login should fail");

    assert!(matches!(&err, ClientError::Login { message } if message == "账号已停用"));
    assert!(harness.storage.is_empty());
    assert_eq!(harness.presenter.errors(), vec!["账号已停用".to_string()]);
    assert!(harness.navigator.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn login_with_blank_code_never_calls_backend() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/wechat/openid");
        then.status(200);
    });

    let harness = Harness::new(&server.base_url());
    let outcome = harness.facade.login_with_code("  ").await;

    assert!(matches!(outcome, Err(ClientError::Login { .. })));
    mock.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn batch_posts_envelope() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/batch")
            .header("authorization", "Bearer abc")
            .json_body(json!({
                "entity": "order",
                "action": "query",
                "conditions": {"status": "open"},
                "fetch": ["id", "customer"]
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 200, "success": true, "data": [{"id": 1}]}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let envelope = RequestEnvelope::new("order", Action::Query)
        .with_conditions(json!({"status": "open"}))
        .with_fetch(["id", "customer"]);
    let response = harness.facade.batch(&envelope).await?;

    mock.assert();
    assert!(response.is_success());
    assert_eq!(response.into_data()?, json!([{"id": 1}]));
    Ok(())
}

#[tokio::test]
async fn batch_refusal_becomes_business_error() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/batch");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"code": 400, "success": false, "msg": "实体不存在"}));
    });

    let harness = Harness::new(&server.base_url());
    harness.login("abc")?;
    let response = harness
        .facade
        .batch(&RequestEnvelope::query("ghost"))
        .await?;

    assert!(!response.is_success());
    let err = response.into_data().expect_err("refusal should fail");
    assert_eq!(err.user_message(), "实体不存在");
    Ok(())
}

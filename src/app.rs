use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;
use crate::{auth, contact, content};

pub fn build_app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let cors = cors_layer(&state.config.cors_origins);

    let router = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(contact::router())
                .merge(content::router())
                .route("/health", get(|| async { "ok" })),
        )
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state);

    with_http_layers(router, cors)
}

/// Explicit origin list, or permissive when none is configured.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn with_http_layers(router: Router, cors: CorsLayer) -> Router {
    router.layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                tracing::info_span!(
                    "http_request",
                    %method,
                    uri = %uri,
                    status = tracing::field::Empty
                )
            })
            .on_response(
                |res: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    let latency_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        tracing::error!(%status, latency_ms, "response");
                    } else {
                        tracing::info!(%status, latency_ms, "response");
                    }
                },
            ),
    )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{jwt::JwtKeys, repo::UserStore, reset},
        mail::testing::RecordingMailer,
        state::testing::{fake, fake_with_mailer, Fake},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn token_for(f: &Fake, is_admin: bool) -> String {
        JwtKeys::from(&f.state.config.jwt)
            .sign(Uuid::new_v4(), is_admin)
            .unwrap()
    }

    #[tokio::test]
    async fn signup_login_scenario() {
        let f = fake();
        let app = build_app(f.state.clone());

        let (s, body) = call(&app, "POST", "/api/signup", Some(json!({"name":"A","email":"a@x.com","password":"pw1"})), None).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(body["message"], "User created successfully");
        assert!(body.get("password").is_none());

        let (s, body) = call(&app, "POST", "/api/signup", Some(json!({"name":"A","email":"a@x.com","password":"pw2"})), None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists");

        let (s, body) = call(&app, "POST", "/api/login", Some(json!({"email":"a@x.com","password":"pw1"})), None).await;
        assert_eq!(s, StatusCode::OK);
        assert!(body["token"].as_str().map_or(false, |t| !t.is_empty()));
        assert_eq!(body["user"]["name"], "A");
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["isAdmin"], false);
        assert!(body["user"].get("passwordHash").is_none());

        let (s, wrong) = call(&app, "POST", "/api/login", Some(json!({"email":"a@x.com","password":"wrong"})), None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        let (s2, unknown) = call(&app, "POST", "/api/login", Some(json!({"email":"z@x.com","password":"pw1"})), None).await;
        assert_eq!(s2, StatusCode::BAD_REQUEST);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn signup_missing_fields_is_400() {
        let f = fake();
        let app = build_app(f.state.clone());
        let (s, body) = call(&app, "POST", "/api/signup", Some(json!({"email":"a@x.com"})), None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "All fields are required");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn forgot_password_same_answer_for_known_and_unknown() {
        let f = fake();
        let app = build_app(f.state.clone());
        call(&app, "POST", "/api/signup", Some(json!({"name":"A","email":"a@x.com","password":"pw1"})), None).await;

        let known = call(&app, "POST", "/api/forgot-password", Some(json!({"email":"a@x.com"})), None).await;
        let unknown = call(&app, "POST", "/api/forgot-password", Some(json!({"email":"nobody@x.com"})), None).await;
        assert_eq!(known.0, StatusCode::OK);
        assert_eq!(known, unknown);
        assert_eq!(
            known.1["message"],
            "If an account with that email exists, a reset link has been sent."
        );
        assert_eq!(f.mailer.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn forgot_password_delivery_failure_is_500_and_rolled_back() {
        let f = fake_with_mailer(RecordingMailer::failing());
        let app = build_app(f.state.clone());
        call(&app, "POST", "/api/signup", Some(json!({"name":"A","email":"a@x.com","password":"pw1"})), None).await;

        let (s, body) = call(&app, "POST", "/api/forgot-password", Some(json!({"email":"a@x.com"})), None).await;
        assert_eq!(s, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error sending password reset email.");
        let user = f.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(!user.has_pending_reset());
    }

    #[tokio::test]
    async fn reset_password_once_then_invalid() {
        let f = fake();
        let app = build_app(f.state.clone());
        call(&app, "POST", "/api/signup", Some(json!({"name":"A","email":"a@x.com","password":"pw1"})), None).await;
        call(&app, "POST", "/api/forgot-password", Some(json!({"email":"a@x.com"})), None).await;

        let html = f.mailer.last().await.unwrap().html;
        let start = html.find("token=").unwrap() + 6;
        let token: String = html[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect();
        let user = f.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.password_reset_token_hash, Some(reset::hash_token(&token)));

        let (s, body) = call(&app, "POST", "/api/reset-password", Some(json!({"token": token, "password":"pw9"})), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["message"], "Password has been reset successfully.");

        let (s, body) = call(&app, "POST", "/api/reset-password", Some(json!({"token": token, "password":"pw10"})), None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Password reset token is invalid or has expired.");

        let (s, _) = call(&app, "POST", "/api/login", Some(json!({"email":"a@x.com","password":"pw9"})), None).await;
        assert_eq!(s, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_requires_token() {
        let f = fake();
        let app = build_app(f.state.clone());
        let (s, body) = call(&app, "GET", "/api/protected", None, None).await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let token = token_for(&f, false);
        let (s, body) = call(&app, "GET", "/api/protected", None, Some(&token)).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["message"], "This is protected data");
        assert_eq!(body["user"]["isAdmin"], false);
    }

    #[tokio::test]
    async fn content_get_seeds_default_once() {
        let f = fake();
        let app = build_app(f.state.clone());
        let (s, first) = call(&app, "GET", "/api/content/about", None, None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(first["success"], true);
        assert_eq!(first["sectionId"], "about");
        assert!(first["html"].as_str().unwrap().contains("About TechVision Solutions"));

        let (_, second) = call(&app, "GET", "/api/content/about", None, None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn content_put_requires_admin() {
        let f = fake();
        let app = build_app(f.state.clone());

        let (s, _) = call(&app, "PUT", "/api/content/about", Some(json!({"html":"<p>x</p>"})), None).await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);

        let user_token = token_for(&f, false);
        let (s, body) = call(&app, "PUT", "/api/content/about", Some(json!({"html":"<p>x</p>"})), Some(&user_token)).await;
        assert_eq!(s, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Admin access required");

        let admin_token = token_for(&f, true);
        let (s, body) = call(&app, "PUT", "/api/content/about", Some(json!({"html":""})), Some(&admin_token)).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["html"], "");
        assert_eq!(body["sectionId"], "about");

        let (_, body) = call(&app, "GET", "/api/content/about", None, None).await;
        assert_eq!(body["html"], "");
    }

    #[tokio::test]
    async fn content_put_without_html_is_400() {
        let f = fake();
        let app = build_app(f.state.clone());
        let admin_token = token_for(&f, true);
        let (s, body) = call(&app, "PUT", "/api/content/blog", Some(json!({})), Some(&admin_token)).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "HTML content is required");
        let (s, _) = call(&app, "PUT", "/api/content/blog", Some(json!({"html": null})), Some(&admin_token)).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn content_list_is_admin_only() {
        let f = fake();
        let app = build_app(f.state.clone());
        call(&app, "GET", "/api/content/services", None, None).await;
        call(&app, "GET", "/api/content/about", None, None).await;

        let (s, _) = call(&app, "GET", "/api/content", None, Some(&token_for(&f, false))).await;
        assert_eq!(s, StatusCode::FORBIDDEN);

        let (s, body) = call(&app, "GET", "/api/content", None, Some(&token_for(&f, true))).await;
        assert_eq!(s, StatusCode::OK);
        let ids: Vec<&str> = body["content"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["sectionId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["about", "services"]);
    }

    #[tokio::test]
    async fn contact_stores_and_notifies() {
        let f = fake();
        let app = build_app(f.state.clone());
        let (s, body) = call(&app, "POST", "/api/contact", Some(json!({"name":"Bob","email":"bob@x.com","message":"Hi there"})), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["message"], "Message sent successfully!");
        assert_eq!(f.contacts.messages.read().await.len(), 1);
        let note = f.mailer.last().await.unwrap();
        assert_eq!(note.to, "inbox@techvision.com");
        assert!(note.html.contains("Hi there"));
    }

    #[tokio::test]
    async fn contact_notification_failure_still_succeeds() {
        let f = fake_with_mailer(RecordingMailer::failing());
        let app = build_app(f.state.clone());
        let (s, _) = call(&app, "POST", "/api/contact", Some(json!({"name":"Bob","email":"bob@x.com","message":"Hi"})), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(f.contacts.messages.read().await.len(), 1);
    }

    #[tokio::test]
    async fn contact_requires_fields() {
        let f = fake();
        let app = build_app(f.state.clone());
        let (s, body) = call(&app, "POST", "/api/contact", Some(json!({"name":"Bob","message":"Hi"})), None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please fill in all contact fields.");
        assert!(f.contacts.messages.read().await.is_empty());
    }

    #[tokio::test]
    async fn health_ok() {
        let f = fake();
        let app = build_app(f.state.clone());
        let res = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    async fn call_raw(
        app: &Router,
        method: &str,
        uri: &str,
        content_type: Option<&str>,
        body: &'static str,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let res = app.clone().oneshot(req.body(Body::from(body)).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn unreadable_signup_bodies_are_json_400() {
        let f = fake();
        let app = build_app(f.state.clone());
        let json = Some("application/json");
        for (ct, body) in [
            (None, r#"{"name":"A","email":"a@x.com","password":"pw1"}"#),
            (Some("text/plain"), r#"{"name":"A","email":"a@x.com","password":"pw1"}"#),
            (json, r#"{"name":"A","email":5,"password":"pw1"}"#),
            (json, "{not json"),
        ] {
            let (s, body) = call_raw(&app, "POST", "/api/signup", ct, body, None).await;
            assert_eq!(s, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["message"].is_string());
        }
        assert!(f.users.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_content_update_is_json_400_after_auth() {
        let f = fake();
        let app = build_app(f.state.clone());
        let admin = token_for(&f, true);

        let (s, body) = call_raw(&app, "PUT", "/api/content/about", None, r#"{"html":"x"}"#, Some(&admin)).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (s, body) = call_raw(&app, "PUT", "/api/content/about", Some("application/json"), r#"{"html":42}"#, Some(&admin)).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request body");

        let (s, _) = call_raw(&app, "PUT", "/api/content/about", None, "", None).await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cors_allow_list_answers_preflight_for_listed_origin_only() {
        let app = with_http_layers(
            Router::new().route("/ping", get(|| async { "pong" })),
            cors_layer(&["http://localhost:5500".to_string(), "bad\norigin".to_string()]),
        );
        let preflight = |origin: &'static str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/ping")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                .body(Body::empty())
                .unwrap()
        };

        let res = app.clone().oneshot(preflight("http://localhost:5500")).await.unwrap();
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5500"
        );
        let methods = res.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap().to_str().unwrap();
        assert!(methods.contains("PUT"));

        let res = app.oneshot(preflight("http://evil.example")).await.unwrap();
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}

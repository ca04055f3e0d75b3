mod auth;
mod communities;
mod context;
mod errors;
mod schemas;
mod serialized;

use std::net::{Ipv6Addr, SocketAddr};

pub use context::*;
pub use errors::*;

use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Builds the API router
pub fn router(context: ServerContext) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/communities", communities::router());

    Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(context)
}

/// Starts the communal server
pub async fn run_server(context: ServerContext, port: u16) -> std::io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on {addr}");

    axum::serve(listener, router(context).into_make_service()).await
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use communal_collab::Collab;
    use communal_core::{ArcedStore, Config};
    use communal_impls::MemoryStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, ServerContext};

    fn app() -> (MemoryStore, axum::Router) {
        let store = MemoryStore::new();
        let arced: ArcedStore = Arc::new(store.clone());

        let context = ServerContext {
            collab: Arc::new(Collab::new(Config::default(), arced)),
        };

        (store, router(context))
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));

        (status, value)
    }

    async fn signed_in(app: &axum::Router, email: &str) -> String {
        let (status, _) = send(
            app,
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "email": email, "password": "hunter22" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "hunter22" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["greeting"], json!("Welcome back john"));

        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn community_lifecycle() {
        let (store, app) = app();
        let token = signed_in(&app, "john@example.com").await;

        let (status, created) = send(
            &app,
            "POST",
            "/v1/communities",
            Some(&token),
            Some(json!({ "name": "rust", "privacyType": "restricted" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["name"], json!("rust"));
        assert_eq!(created["numberOfMembers"], json!(1));
        assert_eq!(created["privacyType"], json!("restricted"));

        let (status, fetched) = send(&app, "GET", "/v1/communities/rust", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let documents = store.len();
        let (status, message) = send(
            &app,
            "POST",
            "/v1/communities",
            Some(&token),
            Some(json!({ "name": "rust" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, json!("Sorry, r/rust is taken. Try another!"));
        assert_eq!(store.len(), documents);
    }

    #[tokio::test]
    async fn community_creation_requires_a_session() {
        let (store, app) = app();

        let (status, _) = send(
            &app,
            "POST",
            "/v1/communities",
            None,
            Some(json!({ "name": "rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/communities",
            Some("made-up-token"),
            Some(json!({ "name": "rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalid_names_are_bad_requests() {
        let (_, app) = app();
        let token = signed_in(&app, "john@example.com").await;

        for name in ["ab", "no spaces", "way_too_long_for_a_community"] {
            let (status, _) = send(
                &app,
                "POST",
                "/v1/communities",
                Some(&token),
                Some(json!({ "name": name })),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{name:?}");
        }

        let (status, _) = send(&app, "GET", "/v1/communities/no%20spaces", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn outages_are_not_reported_as_taken_names() {
        let (store, app) = app();
        let token = signed_in(&app, "john@example.com").await;

        store.set_available(false);

        let (status, message) = send(
            &app,
            "POST",
            "/v1/communities",
            Some(&token),
            Some(json!({ "name": "rust" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let message = message.as_str().unwrap();
        assert!(!message.contains("taken"), "{message}");
        assert!(!message.contains("signed in"), "{message}");

        store.set_available(true);
        assert!(store.paths().iter().all(|p| p.collection() != "communities"));
    }

    #[tokio::test]
    async fn outages_during_session_lookup_are_not_reported_as_signed_out() {
        let (store, app) = app();
        let token = signed_in(&app, "john@example.com").await;

        store.set_available(false);

        let (status, _) = send(&app, "GET", "/v1/auth/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(&app, "POST", "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Requests without a session are still rejected as signed out
        let (status, _) = send(
            &app,
            "POST",
            "/v1/communities",
            None,
            Some(json!({ "name": "rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        store.set_available(true);

        let (status, _) = send(&app, "GET", "/v1/auth/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn lowercase_bearer_scheme_is_accepted() {
        let (_, app) = app();
        let token = signed_in(&app, "john@example.com").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/v1/auth/user")
                    .header(header::AUTHORIZATION, format!("bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn session_endpoints() {
        let (_, app) = app();
        let token = signed_in(&app, "john@example.com").await;

        let (status, user) = send(&app, "GET", "/v1/auth/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["email"], json!("john@example.com"));

        let (status, _) = send(&app, "POST", "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", "/v1/auth/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": "john@example.com", "password": "wrong password" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

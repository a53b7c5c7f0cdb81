use anyhow::Context;
use axum::Router;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use tokio::net;
use vrl_common::entities::{
    Entity, Singleton, event::Event, home::HomeContent, journal::JournalArticle,
    journal::JournalContent, publication::Publication, staff::Staff,
};

use crate::domain::AppState;
use crate::infrastructure::http::handlers::entities::{
    create_entity, delete_entity, get_entity, list_entities, update_entity,
};
use crate::infrastructure::http::handlers::singletons::{get_singleton, update_singleton};
use crate::infrastructure::http::handlers::{health_check, users};

mod api;
mod extract;
mod handlers;
mod querystring;

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub port: &'a str,
}

/// The application's HTTP server. The underlying HTTP package is opaque to module consumers.
pub struct HttpServer {
    router: axum::Router,
    listener: net::TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to the port specified in `config`.
    pub async fn new(state: impl AppState, config: HttpServerConfig<'_>) -> anyhow::Result<Self> {
        // see: https://github.com/Ptrskay3/axum-prometheus
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        let router = router(state)
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);

        let listener = net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("failed to listen on {}", config.port))?;

        Ok(Self { router, listener })
    }

    /// Runs the HTTP server.
    pub async fn run(self) -> anyhow::Result<()> {
        let address = self
            .listener
            .local_addr()
            .context("failed to read the bound address")?;
        tracing::info!("listening on {}", address);
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running server")?;
        Ok(())
    }
}

/// Health check plus the `/api` routes, traced, without the metrics endpoint.
pub fn router<S: AppState>(state: S) -> Router {
    let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
        |request: &axum::extract::Request<_>| {
            let uri = request.uri().to_string();
            tracing::info_span!("http_request", method = ?request.method(), uri)
        },
    );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(trace_layer)
        .with_state(state)
}

fn api_routes<S: AppState>() -> Router<S> {
    let router = Router::new()
        .route("/users", get(users::list_users::<S>))
        .route("/users/register", axum::routing::post(users::register::<S>))
        .route("/users/login", axum::routing::post(users::login::<S>))
        .route("/users/me", get(users::me::<S>))
        .route("/users/{id}", axum::routing::patch(users::update_user::<S>));

    let router = entity_routes::<S, Event>(router, "/events");
    let router = entity_routes::<S, Publication>(router, "/publications");
    let router = entity_routes::<S, Staff>(router, "/staffs");
    let router = entity_routes::<S, JournalArticle>(router, "/journal-articles");
    let router = singleton_routes::<S, HomeContent>(router, "/home-content");
    singleton_routes::<S, JournalContent>(router, "/journal-content")
}

fn entity_routes<S: AppState, E: Entity>(router: Router<S>, path: &str) -> Router<S> {
    router
        .route(
            path,
            get(list_entities::<S, E>).post(create_entity::<S, E>),
        )
        .route(
            &format!("{path}/{{id}}"),
            get(get_entity::<S, E>)
                .patch(update_entity::<S, E>)
                .delete(delete_entity::<S, E>),
        )
}

fn singleton_routes<S: AppState, T: Singleton>(router: Router<S>, path: &str) -> Router<S> {
    router.route(
        path,
        get(get_singleton::<S, T>).patch(update_singleton::<S, T>),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use vrl_common::entities::user::RegisterUserRequest;
    use vrl_common::test_utils::InMemoryStore;

    use super::*;
    use crate::domain::Pagination;
    use crate::domain::auth::TokenService;
    use crate::domain::repository::UserRepository;
    use crate::infrastructure::AppStateImpl;

    const PASSWORD: &str = "Correct1Horse";

    struct TestApp {
        store: InMemoryStore,
        state: AppStateImpl<InMemoryStore>,
    }

    impl TestApp {
        fn new() -> Self {
            let store = InMemoryStore::new();
            let state = AppStateImpl::new(
                store.clone(),
                TokenService::new("test-secret", 60),
                Pagination {
                    default_limit: 10,
                    max_limit: 50,
                },
            );
            Self { store, state }
        }

        async fn token_for(&self, email: &str, role: &str) -> String {
            let registration = RegisterUserRequest {
                name: Some("Test User".into()),
                email: Some(email.into()),
                password: Some(PASSWORD.into()),
                role: Some(role.into()),
            }
            .validate()
            .unwrap();
            let user = UserRepository::new(&self.store)
                .register(registration)
                .await
                .unwrap();
            self.state.tokens().issue(&user).unwrap()
        }

        async fn send(
            &self,
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

            let response = router(self.state.clone())
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }
    }

    fn publication(title: &str, category: &str) -> Value {
        json!({
            "title": title,
            "documentUrl": "https://vrl.example.org/report.pdf",
            "category": category,
            "authors": [{ "name": "Ada Lovelace" }]
        })
    }

    #[tokio::test]
    async fn health_check_works() {
        let app = TestApp::new();
        let (status, _) = app.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn writes_require_an_admin_token() {
        let app = TestApp::new();
        let user = app.token_for("reader@vrl.org", "user").await;
        let body = Some(publication("Flood maps", "report"));

        let (status, json) = app.send("POST", "/api/publications", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);

        let (status, _) = app
            .send("POST", "/api/publications", Some(&user), body.clone())
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send("POST", "/api/publications", Some("not.a.token"), body)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(app.store.documents("publications").is_empty());
    }

    #[tokio::test]
    async fn entity_lifecycle() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;

        let (status, json) = app
            .send("POST", "/api/publications", Some(&admin), Some(publication("Flood maps", "report")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        let id = json["data"]["_id"].as_str().unwrap().to_owned();

        let (status, json) = app
            .send("PATCH", &format!("/api/publications/{id}"), Some(&admin), Some(json!({ "category": "paper" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["category"], "paper");
        assert_eq!(json["data"]["title"], "Flood maps");

        let (status, json) = app.send("GET", &format!("/api/publications/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["category"], "paper");

        let (status, _) = app
            .send("DELETE", &format!("/api/publications/{id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = app.send("GET", &format!("/api/publications/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Publication not found");
    }

    #[tokio::test]
    async fn list_is_paginated_and_filtered() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;
        for (title, category) in [("A", "report"), ("B", "report"), ("C", "paper")] {
            app.send("POST", "/api/publications", Some(&admin), Some(publication(title, category)))
                .await;
        }

        let (status, json) = app.send("GET", "/api/publications?limit=2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["page"], 1);
        assert_eq!(json["limit"], 2);
        assert_eq!(json["total"], 3);
        assert_eq!(json["totalPages"], 2);

        let (_, json) = app
            .send("GET", "/api/publications?category=report&page=1", None, None)
            .await;
        assert_eq!(json["total"], 2);
    }

    #[tokio::test]
    async fn patch_with_null_clears_an_optional_field() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;
        let mut body = publication("Flood maps", "report");
        body["thumbnail"] = json!("https://vrl.example.org/flood.png");
        let (_, json) = app
            .send("POST", "/api/publications", Some(&admin), Some(body))
            .await;
        let id = json["data"]["_id"].as_str().unwrap().to_owned();

        let (status, json) = app
            .send("PATCH", &format!("/api/publications/{id}"), Some(&admin), Some(json!({ "thumbnail": null })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["thumbnail"].is_null());
        assert_eq!(json["data"]["title"], "Flood maps");
        assert!(!app.store.documents("publications")[0].contains_key("thumbnail"));
    }

    #[tokio::test]
    async fn legacy_events_do_not_break_the_listing() {
        let app = TestApp::new();
        let now = vrl_common::persistence::timestamp(chrono::Utc::now());
        for (title, status) in [("Field trip", "Upcoming"), ("Open lab", "active")] {
            app.store.seed(
                "events",
                mongodb::bson::doc! {
                    "title": title,
                    "date": "2024-05-17",
                    "time": "14:30",
                    "status": status,
                    "createdAt": now.clone(),
                    "updatedAt": now.clone(),
                },
            );
        }

        let (status, json) = app.send("GET", "/api/events", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Open lab"]);
        assert_eq!(json["data"][0]["status"], "Active");
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;
        app.send("POST", "/api/publications", Some(&admin), Some(publication("A", "report")))
            .await;

        let (status, json) = app
            .send("GET", "/api/publications?page=18446744073709551615", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"].as_array().unwrap().is_empty());
        assert_eq!(json["total"], 1);
    }

    #[tokio::test]
    async fn validation_failures_are_itemized() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;

        let (status, json) = app
            .send("POST", "/api/events", Some(&admin), Some(json!({ "title": "Open day", "date": "2024-02-30" })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = json["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"date"));
        assert!(fields.contains(&"time"));
        assert!(app.store.documents("events").is_empty());
    }

    #[tokio::test]
    async fn malformed_identifier_is_rejected_before_lookup() {
        let app = TestApp::new();
        let (status, json) = app.send("GET", "/api/events/not-an-id", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["errors"][0]["field"], "id");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/staffs")
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();

        let response = router(app.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn singleton_reads_defaults_and_detects_stale_writes() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;

        let (status, json) = app.send("GET", "/api/journal-content", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["pageTitle"], "VRL Journal");

        let (status, json) = app
            .send("PATCH", "/api/home-content", Some(&admin), Some(json!({ "heroTitle": "Welcome" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["version"], 1);

        let (status, _) = app
            .send("PATCH", "/api/home-content", Some(&admin), Some(json!({ "heroTitle": "Hi", "version": 0 })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send("PATCH", "/api/home-content", Some(&admin), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn register_login_and_me() {
        let app = TestApp::new();
        let registration = json!({ "name": "Grace", "email": "Grace@Navy.mil", "password": PASSWORD });

        let (status, json) = app
            .send("POST", "/api/users/register", None, Some(registration.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["email"], "grace@navy.mil");
        assert_eq!(json["data"]["role"], "user");
        assert!(json["data"].get("passwordHash").is_none());

        let (status, _) = app
            .send("POST", "/api/users/register", None, Some(registration))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send("POST", "/api/users/login", None, Some(json!({ "email": "grace@navy.mil", "password": "wrong" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = app
            .send("POST", "/api/users/login", None, Some(json!({ "email": "GRACE@navy.mil", "password": PASSWORD })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = json["data"]["token"].as_str().unwrap().to_owned();

        let (status, json) = app.send("GET", "/api/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Grace");

        let (status, _) = app.send("GET", "/api/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn only_admins_create_admins_and_list_users() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;
        let user = app.token_for("reader@vrl.org", "user").await;
        let body = json!({ "name": "Root", "email": "root@vrl.org", "password": PASSWORD, "role": "admin" });

        let (status, _) = app
            .send("POST", "/api/users/register", Some(&user), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send("POST", "/api/users/register", Some(&admin), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["role"], "admin");

        let (status, _) = app.send("GET", "/api/users", Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, json) = app.send("GET", "/api/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
    }

    #[tokio::test]
    async fn users_update_themselves_but_not_their_role() {
        let app = TestApp::new();
        let admin = app.token_for("admin@vrl.org", "admin").await;
        let user = app.token_for("reader@vrl.org", "user").await;
        let claims = app.state.tokens().verify(&user).unwrap();
        let admin_claims = app.state.tokens().verify(&admin).unwrap();
        let own = format!("/api/users/{}", claims.sub);

        let (status, json) = app
            .send("PATCH", &own, Some(&user), Some(json!({ "name": "Renamed" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Renamed");

        let (status, _) = app
            .send("PATCH", &own, Some(&user), Some(json!({ "role": "admin" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send("PATCH", &format!("/api/users/{}", admin_claims.sub), Some(&user), Some(json!({ "name": "Mallory" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send("PATCH", &own, Some(&admin), Some(json!({ "role": "admin" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["role"], "admin");
    }
}

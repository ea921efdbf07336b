pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_session;
pub use state::AppState;
pub use ws_handler::chat_ws_handler;

/// Listing images travel inline as data URIs.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds every API route around the shared state.
///
/// CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/session", get(auth::session_handler))
        .route("/listings", get(rest::list_listings_handler))
        .route("/listings/{id}", get(rest::get_listing_handler))
        .route("/listings/{id}/reviews", get(rest::list_reviews_handler))
        .route("/agents/{id}/listings", get(rest::agent_listings_handler));

    // Protected routes (session required)
    let protected_routes = Router::new()
        .route("/auth/profile", put(auth::profile_handler))
        .route("/listings", post(rest::create_listing_handler))
        .route(
            "/listings/{id}",
            put(rest::update_listing_handler).delete(rest::delete_listing_handler),
        )
        .route("/listings/describe", post(rest::describe_listing_handler))
        .route("/listings/{id}/reviews", post(rest::add_review_handler))
        .route("/agents/me/inbox", get(rest::inbox_handler))
        .route("/threads/{counterpartId}", get(rest::thread_handler))
        .route("/admin/stats", get(rest::stats_handler))
        .route("/chat/{counterpartId}", get(chat_ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::OfflineTextAdapter, config::Config};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;
    use yourroom_core::{
        conversation::WELCOME_MESSAGE_ID, EntityStore, InMemoryCollectionStore, PromptKind,
        TextGenerator,
    };

    fn app() -> Router {
        let store = Arc::new(EntityStore::new(Arc::new(InMemoryCollectionStore::new())));
        let generator = TextGenerator::new(Arc::new(OfflineTextAdapter));
        let config = Arc::new(Config::from_vars(&HashMap::new()).unwrap());
        router(Arc::new(AppState::new(store, generator, config)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, name: &str, role: &str) -> Value {
        let (status, session) = call(
            app,
            "POST",
            "/auth/register",
            Some(json!({
                "name": name,
                "email": format!("{}@yourroom.tg", name.to_lowercase()),
                "role": role,
                "phoneNumber": "+228 90 00 00 00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        session
    }

    fn studio() -> Value {
        json!({
            "title": "Studio meublé",
            "price": 45000,
            "commune": "Agoè",
            "quartier": "Assiyéyé",
            "images": ["a.png"]
        })
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let app = app();
        let (status, _) = call(&app, "GET", "/auth/session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let session = register(&app, "Kossi", "AGENT").await;
        assert_eq!(session["role"], "AGENT");

        let (status, current) = call(&app, "GET", "/auth/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(current["id"], session["id"]);

        let (status, updated) = call(
            &app,
            "PUT",
            "/auth/profile",
            Some(json!({ "name": "Kossi A." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Kossi A.");
        assert_eq!(updated["phoneNumber"], "+228 90 00 00 00");

        let (status, _) = call(&app, "POST", "/auth/logout", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "POST", "/auth/logout", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", "/auth/session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let app = app();
        let (status, _) = call(&app, "POST", "/listings", Some(studio())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, "GET", "/agents/me/inbox", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn agent_publishes_and_anyone_searches() {
        let app = app();
        let agent = register(&app, "Kossi", "AGENT").await;

        let (status, listing) = call(&app, "POST", "/listings", Some(studio())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(listing["region"], "TOGO");
        assert_eq!(listing["agentId"], agent["id"]);
        assert_eq!(listing["agentPhone"], "+228 90 00 00 00");

        let (status, found) = call(&app, "GET", "/listings?q=ASSIY", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().map(Vec::len), Some(1));

        let (_, none) = call(&app, "GET", "/listings?q=Kpalime", None).await;
        assert_eq!(none, json!([]));

        let uri = format!("/agents/{}/listings", agent["id"].as_str().unwrap());
        let (_, own) = call(&app, "GET", &uri, None).await;
        assert_eq!(own[0]["id"], listing["id"]);

        let (status, _) = call(&app, "GET", "/listings/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clients_cannot_publish_and_invalid_drafts_are_rejected() {
        let app = app();
        register(&app, "Kossi", "AGENT").await;
        let mut draft = studio();
        draft["images"] = json!([]);
        let (status, _) = call(&app, "POST", "/listings", Some(draft)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        register(&app, "Ama", "CLIENT").await;
        let (status, _) = call(&app, "POST", "/listings", Some(studio())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reviews_and_deletion() {
        let app = app();
        register(&app, "Kossi", "AGENT").await;
        let (_, listing) = call(&app, "POST", "/listings", Some(studio())).await;
        let id = listing["id"].as_str().unwrap().to_string();

        register(&app, "Ama", "CLIENT").await;
        let reviews_uri = format!("/listings/{}/reviews", id);
        let (status, _) = call(
            &app,
            "POST",
            &reviews_uri,
            Some(json!({ "rating": 6, "comment": "Trop beau" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, review) = call(
            &app,
            "POST",
            &reviews_uri,
            Some(json!({ "rating": 4, "comment": "Bon quartier" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(review["clientName"], "Ama");

        let (_, reviews) = call(&app, "GET", &reviews_uri, None).await;
        assert_eq!(reviews[0]["comment"], "Bon quartier");

        let listing_uri = format!("/listings/{}", id);
        let (status, _) = call(&app, "DELETE", &listing_uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        register(&app, "Admin", "ADMIN").await;
        let (status, stats) = call(&app, "GET", "/admin/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats, json!({ "listings": 1, "agents": 1, "reviews": 1 }));

        let (status, _) = call(&app, "DELETE", &listing_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &listing_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn stats_are_reserved_to_administrators() {
        let app = app();
        register(&app, "Ama", "CLIENT").await;
        let (status, _) = call(&app, "GET", "/admin/stats", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn describe_falls_back_when_generation_is_offline() {
        let app = app();
        register(&app, "Kossi", "AGENT").await;
        let (status, body) = call(
            &app,
            "POST",
            "/listings/describe",
            Some(json!({
                "title": "Villa",
                "price": 300000,
                "commune": "Lomé",
                "quartier": "Bè"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["description"],
            PromptKind::Description.failure_fallback()
        );
    }

    #[tokio::test]
    async fn every_documented_path_is_routed() {
        let app = app();
        // With a session, only unrouted paths fall through to 404.
        register(&app, "Admin", "ADMIN").await;
        let doc = <rest::ApiDoc as utoipa::OpenApi>::openapi();
        for path in doc.paths.paths.keys() {
            let uri = path
                .replace("{id}", "some-id")
                .replace("{counterpartId}", "some-counterpart");
            let (status, _) = call(&app, "OPTIONS", &uri, None).await;
            assert_ne!(status, StatusCode::NOT_FOUND, "{path} is not routed");
        }
        let (status, _) = call(&app, "OPTIONS", "/threads", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_thread_shows_the_welcome_message() {
        let app = app();
        register(&app, "Ama", "CLIENT").await;
        let (status, thread) = call(&app, "GET", "/threads/agent-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(thread.as_array().map(Vec::len), Some(1));
        assert_eq!(thread[0]["id"], WELCOME_MESSAGE_ID);
        assert_eq!(thread[0]["senderId"], "agent-1");
        assert_eq!(thread[0]["senderName"], "Agent YOURROOM");

        let (_, inbox) = call(&app, "GET", "/agents/me/inbox", None).await;
        assert_eq!(inbox, json!([]));
    }

    #[tokio::test]
    async fn agents_see_no_welcome_in_an_empty_thread() {
        let app = app();
        register(&app, "Kossi", "AGENT").await;
        let (status, thread) = call(&app, "GET", "/threads/client-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(thread, json!([]));
    }
}

//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the marketplace REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::{
    error::port_error_response,
    web::{auth, state::AppState},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};
use yourroom_core::{
    domain::DEFAULT_REGION, DescriptionBrief, Listing, ListingDraft, MarketplaceStats, Message,
    Review, Session, UserRole,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::session_handler,
        auth::profile_handler,
        list_listings_handler,
        get_listing_handler,
        create_listing_handler,
        update_listing_handler,
        delete_listing_handler,
        describe_listing_handler,
        list_reviews_handler,
        add_review_handler,
        agent_listings_handler,
        inbox_handler,
        thread_handler,
        stats_handler,
    ),
    components(
        schemas(
            auth::Role,
            auth::RegisterRequest,
            auth::SessionPayload,
            auth::ProfileRequest,
            ListingPayload,
            ListingResponse,
            DescribeRequest,
            DescribeResponse,
            ReviewRequest,
            ReviewResponse,
            MessageResponse,
            StatsResponse,
        )
    ),
    tags(
        (name = "YOURROOM API", description = "Rental listings, reviews and agent chat.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The fields an agent submits when publishing or editing a listing.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Monthly rent in FCFA.
    pub price: u64,
    #[serde(default)]
    pub region: Option<String>,
    pub commune: String,
    pub quartier: String,
    #[serde(default)]
    pub rue: String,
    #[serde(default)]
    pub agent_phone: Option<String>,
    pub images: Vec<String>,
}

impl From<ListingPayload> for ListingDraft {
    fn from(payload: ListingPayload) -> Self {
        Self {
            title: payload.title,
            description: payload.description,
            price: payload.price,
            region: region_or_default(payload.region),
            commune: payload.commune,
            quartier: payload.quartier,
            rue: payload.rue,
            agent_phone: payload.agent_phone,
            images: payload.images,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    id: String,
    title: String,
    description: String,
    price: u64,
    region: String,
    commune: String,
    quartier: String,
    rue: String,
    agent_id: String,
    agent_name: String,
    agent_phone: String,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            price: listing.price,
            region: listing.region,
            commune: listing.commune,
            quartier: listing.quartier,
            rue: listing.rue,
            agent_id: listing.agent_id,
            agent_name: listing.agent_name,
            agent_phone: listing.agent_phone,
            images: listing.images,
            created_at: listing.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescribeRequest {
    pub title: String,
    pub price: u64,
    #[serde(default)]
    pub region: Option<String>,
    pub commune: String,
    pub quartier: String,
}

#[derive(Serialize, ToSchema)]
pub struct DescribeResponse {
    description: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// Between 1 and 5 inclusive.
    pub rating: u8,
    pub comment: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    id: String,
    apartment_id: String,
    client_id: String,
    client_name: String,
    rating: u8,
    comment: String,
    date: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            apartment_id: review.apartment_id,
            client_id: review.client_id,
            client_name: review.client_name,
            rating: review.rating,
            comment: review.comment,
            date: review.date,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    id: String,
    sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender_name: Option<String>,
    receiver_id: String,
    content: String,
    timestamp: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    listings: usize,
    agents: usize,
    reviews: usize,
}

impl From<MarketplaceStats> for StatsResponse {
    fn from(stats: MarketplaceStats) -> Self {
        Self {
            listings: stats.listings,
            agents: stats.agents,
            reviews: stats.reviews,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive term matched against title, quartier and commune.
    q: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ThreadQuery {
    /// The listing the conversation is about, if any.
    pub listing_id: Option<String>,
}

fn region_or_default(region: Option<String>) -> String {
    region
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

fn listings_response(listings: Vec<Listing>) -> Json<Vec<ListingResponse>> {
    Json(listings.into_iter().map(ListingResponse::from).collect())
}

fn messages_response(messages: Vec<Message>) -> Json<Vec<MessageResponse>> {
    Json(messages.into_iter().map(MessageResponse::from).collect())
}

//=========================================================================================
// Listing Handlers
//=========================================================================================

/// List every listing, newest first, or only those matching `q`.
#[utoipa::path(
    get,
    path = "/listings",
    params(SearchQuery),
    responses(
        (status = 200, description = "Listings, newest first", body = [ListingResponse])
    )
)]
pub async fn list_listings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let listings = match query.q {
        Some(term) => state.store.search_listings(&term).await,
        None => state.store.list_listings().await,
    };
    listings_response(listings)
}

#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "The listing id.")),
    responses(
        (status = 200, description = "The listing", body = ListingResponse),
        (status = 404, description = "Unknown listing")
    )
)]
pub async fn get_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let listing = state.store.find_listing(&listing_id).await.ok_or((
        StatusCode::NOT_FOUND,
        format!("Listing {} not found", listing_id),
    ))?;
    Ok(Json(ListingResponse::from(listing)))
}

/// Publish a listing owned by the current agent.
#[utoipa::path(
    post,
    path = "/listings",
    request_body = ListingPayload,
    responses(
        (status = 201, description = "Listing created", body = ListingResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "No active session"),
        (status = 403, description = "The session is not an agent")
    )
)]
pub async fn create_listing_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ListingPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let listing = state
        .store
        .create_listing(&session, payload.into())
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(ListingResponse::from(listing))))
}

#[utoipa::path(
    put,
    path = "/listings/{id}",
    request_body = ListingPayload,
    params(("id" = String, Path, description = "The listing id.")),
    responses(
        (status = 200, description = "Listing updated", body = ListingResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "The listing belongs to another agent"),
        (status = 404, description = "Unknown listing")
    )
)]
pub async fn update_listing_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(listing_id): Path<String>,
    Json(payload): Json<ListingPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let listing = state
        .store
        .update_listing(&session, &listing_id, payload.into())
        .await
        .map_err(port_error_response)?;
    Ok(Json(ListingResponse::from(listing)))
}

/// Delete a listing. Deleting an unknown id succeeds.
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "The listing id.")),
    responses(
        (status = 204, description = "Listing deleted or already absent"),
        (status = 403, description = "Neither the owner nor an administrator")
    )
)]
pub async fn delete_listing_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let removed = state
        .store
        .delete_listing(&session, &listing_id)
        .await
        .map_err(port_error_response)?;
    if !removed {
        info!("Listing {} was already absent", listing_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Draft a marketing description for a listing. Always answers with some text.
#[utoipa::path(
    post,
    path = "/listings/describe",
    request_body = DescribeRequest,
    responses(
        (status = 200, description = "Generated or fallback description", body = DescribeResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn describe_listing_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DescribeRequest>,
) -> impl IntoResponse {
    let description = state
        .generator
        .describe_listing(DescriptionBrief {
            title: req.title,
            price: req.price,
            region: region_or_default(req.region),
            commune: req.commune,
            quartier: req.quartier,
        })
        .await;
    Json(DescribeResponse { description })
}

//=========================================================================================
// Review Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/listings/{id}/reviews",
    params(("id" = String, Path, description = "The listing id.")),
    responses(
        (status = 200, description = "Reviews, newest first", body = [ReviewResponse])
    )
)]
pub async fn list_reviews_handler(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
) -> impl IntoResponse {
    let reviews = state.store.list_reviews_for(&listing_id).await;
    Json(
        reviews
            .into_iter()
            .map(ReviewResponse::from)
            .collect::<Vec<_>>(),
    )
}

#[utoipa::path(
    post,
    path = "/listings/{id}/reviews",
    request_body = ReviewRequest,
    params(("id" = String, Path, description = "The listing id.")),
    responses(
        (status = 201, description = "Review added", body = ReviewResponse),
        (status = 400, description = "Rating out of range or empty comment"),
        (status = 404, description = "Unknown listing")
    )
)]
pub async fn add_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(listing_id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let review = state
        .store
        .add_review(&session, &listing_id, req.rating, &req.comment)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

//=========================================================================================
// Agent, Thread and Admin Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/agents/{id}/listings",
    params(("id" = String, Path, description = "The agent id.")),
    responses(
        (status = 200, description = "The agent's listings, newest first", body = [ListingResponse])
    )
)]
pub async fn agent_listings_handler(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    listings_response(state.store.list_listings_by_agent(&agent_id).await)
}

/// Every message received by the current session, in append order.
#[utoipa::path(
    get,
    path = "/agents/me/inbox",
    responses(
        (status = 200, description = "Received messages", body = [MessageResponse]),
        (status = 401, description = "No active session")
    )
)]
pub async fn inbox_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    messages_response(state.store.inbox_for(&session.id).await)
}

/// The thread between the current session and `counterpartId`.
///
/// An empty thread is shown as a single welcome message that is never stored.
#[utoipa::path(
    get,
    path = "/threads/{counterpartId}",
    params(
        ("counterpartId" = String, Path, description = "The other party of the thread."),
        ThreadQuery
    ),
    responses(
        (status = 200, description = "Thread messages in append order", body = [MessageResponse]),
        (status = 401, description = "No active session")
    )
)]
pub async fn thread_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(counterpart_id): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> impl IntoResponse {
    let view = state
        .engine
        .open(Some(session), &counterpart_id, query.listing_id.as_deref())
        .await;
    messages_response(view.messages().await)
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Marketplace totals", body = StatsResponse),
        (status = 401, description = "No active session"),
        (status = 403, description = "The session is not an administrator")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if session.role != UserRole::Admin {
        return Err((
            StatusCode::FORBIDDEN,
            "Administrator role required".to_string(),
        ));
    }
    Ok(Json(StatsResponse::from(state.store.stats().await)))
}

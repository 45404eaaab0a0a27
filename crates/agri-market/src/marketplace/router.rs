use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ContactUpdate, ImagePayload, ListingDraft, ListingId, PaymentRequestId, SellerId,
    SubscriptionTier,
};
use super::entitlements::EntitlementError;
use super::listings::{ImageEdit, ListingError};
use super::payments::PaymentError;
use super::ranking::MarketplaceQuery;
use super::repository::{
    IdentityProvider, ImageStore, ListingRepository, PaymentRepository, ProfileRepository,
    RepositoryError,
};
use super::service::{Marketplace, ProfileError};

/// Shared router state: the marketplace facade plus the identity provider
/// used to resolve bearer tokens.
pub struct MarketplaceApp<L, P, Q, S, I> {
    pub marketplace: Arc<Marketplace<L, P, Q, S>>,
    pub identity: Arc<I>,
}

/// Router builder exposing the marketplace, listing lifecycle, payment, and
/// administrative endpoints.
pub fn marketplace_router<L, P, Q, S, I>(app: Arc<MarketplaceApp<L, P, Q, S, I>>) -> Router
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/api/v1/marketplace", get(browse_handler::<L, P, Q, S, I>))
        .route(
            "/api/v1/listings",
            get(my_listings_handler::<L, P, Q, S, I>)
                .post(create_listing_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/listings/:id",
            put(edit_listing_handler::<L, P, Q, S, I>)
                .delete(delete_listing_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/listings/:id/views",
            post(record_view_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/profile",
            get(profile_handler::<L, P, Q, S, I>).put(update_profile_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/profile/avatar",
            put(update_avatar_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/payments",
            post(submit_payment_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/admin/payments",
            get(payment_queue_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/admin/payments/:id/approve",
            post(approve_payment_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/admin/payments/:id/reject",
            post(reject_payment_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/admin/users",
            get(user_directory_handler::<L, P, Q, S, I>),
        )
        .route(
            "/api/v1/admin/users/:id/plan",
            put(set_plan_handler::<L, P, Q, S, I>),
        )
        .with_state(app)
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    #[serde(flatten)]
    pub draft: ListingDraft,
    #[serde(default)]
    pub main_image: Option<ImagePayload>,
    #[serde(default)]
    pub gallery: Vec<ImagePayload>,
}

#[derive(Debug, Deserialize)]
pub struct EditListingRequest {
    #[serde(flatten)]
    pub draft: ListingDraft,
    #[serde(default)]
    pub images: ImageEdit,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPaymentRequest {
    pub tier: SubscriptionTier,
    pub reference_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    pub tier: SubscriptionTier,
    pub credits: u32,
}

fn authenticate<L, P, Q, S, I>(
    app: &MarketplaceApp<L, P, Q, S, I>,
    headers: &HeaderMap,
) -> Result<SellerId, Response>
where
    I: IdentityProvider,
{
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        let payload = json!({ "error": "missing bearer token" });
        return Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response());
    };

    match app.identity.current_user(token) {
        Some(seller) => Ok(seller),
        None => {
            let payload = json!({ "error": "unknown session" });
            Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn listing_error(err: ListingError) -> Response {
    let status = match &err {
        ListingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ListingError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
        ListingError::SellerNotFound | ListingError::NotFound => StatusCode::NOT_FOUND,
        ListingError::NotOwner => StatusCode::FORBIDDEN,
        ListingError::ImageStore(_) => StatusCode::BAD_GATEWAY,
        ListingError::Repository(repo) => repository_status(repo),
    };
    error_body(status, err.to_string())
}

fn payment_error(err: PaymentError) -> Response {
    let status = match &err {
        PaymentError::Validation(_) | PaymentError::NotPurchasable(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PaymentError::SellerNotFound | PaymentError::NotFound => StatusCode::NOT_FOUND,
        PaymentError::NotAdmin => StatusCode::FORBIDDEN,
        PaymentError::AlreadyProcessed { .. } => StatusCode::CONFLICT,
        PaymentError::Repository(repo) => repository_status(repo),
    };
    error_body(status, err.to_string())
}

fn profile_error(err: ProfileError) -> Response {
    let status = match &err {
        ProfileError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ProfileError::SellerNotFound => StatusCode::NOT_FOUND,
        ProfileError::ImageStore(_) => StatusCode::BAD_GATEWAY,
        ProfileError::Repository(repo) => repository_status(repo),
    };
    error_body(status, err.to_string())
}

fn entitlement_error(err: EntitlementError) -> Response {
    let status = match &err {
        EntitlementError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
        EntitlementError::SellerNotFound => StatusCode::NOT_FOUND,
        EntitlementError::Repository(repo) => repository_status(repo),
    };
    error_body(status, err.to_string())
}

pub(crate) async fn browse_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    Query(query): Query<MarketplaceQuery>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    match app.marketplace.browse(&query) {
        Ok(listings) => {
            let payload = json!({ "count": listings.len(), "listings": listings });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn create_listing_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Json(request): Json<CreateListingRequest>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app
        .marketplace
        .create_listing(&seller, request.draft, request.main_image, request.gallery)
    {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn edit_listing_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<EditListingRequest>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    let id = ListingId(id);
    match app
        .marketplace
        .edit_listing(&id, &seller, request.draft, request.images)
    {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn delete_listing_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app.marketplace.delete_listing(&ListingId(id), &seller) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn my_listings_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app.marketplace.seller_listings(&seller) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn record_view_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    Path(id): Path<String>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    match app.marketplace.record_view(&ListingId(id)) {
        Ok(views) => (StatusCode::OK, Json(json!({ "views": views }))).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn profile_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app.marketplace.profile(&seller) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => entitlement_error(err),
    }
}

pub(crate) async fn update_profile_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Json(contact): Json<ContactUpdate>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app.marketplace.update_contact(&seller, contact) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => entitlement_error(err),
    }
}

pub(crate) async fn update_avatar_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Json(image): Json<ImagePayload>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app.marketplace.update_avatar(&seller, image) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => profile_error(err),
    }
}

pub(crate) async fn submit_payment_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Json(request): Json<SubmitPaymentRequest>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let seller = match authenticate(&app, &headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };

    match app
        .marketplace
        .submit_payment(&seller, request.tier, &request.reference_code)
    {
        Ok(payment) => (StatusCode::ACCEPTED, Json(payment)).into_response(),
        Err(err) => payment_error(err),
    }
}

pub(crate) async fn payment_queue_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let admin = match authenticate(&app, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match app.marketplace.payment_queue(&admin) {
        Ok(entries) => (StatusCode::OK, Json(json!({ "payments": entries }))).into_response(),
        Err(err) => payment_error(err),
    }
}

pub(crate) async fn approve_payment_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let admin = match authenticate(&app, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match app
        .marketplace
        .approve_payment(&PaymentRequestId(id), &admin)
    {
        Ok(payment) => (StatusCode::OK, Json(payment)).into_response(),
        Err(err) => payment_error(err),
    }
}

pub(crate) async fn reject_payment_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let admin = match authenticate(&app, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match app
        .marketplace
        .reject_payment(&PaymentRequestId(id), &admin)
    {
        Ok(payment) => (StatusCode::OK, Json(payment)).into_response(),
        Err(err) => payment_error(err),
    }
}

pub(crate) async fn user_directory_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let admin = match authenticate(&app, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match app.marketplace.user_directory(&admin) {
        Ok(users) => (StatusCode::OK, Json(json!({ "users": users }))).into_response(),
        Err(err) => payment_error(err),
    }
}

pub(crate) async fn set_plan_handler<L, P, Q, S, I>(
    State(app): State<Arc<MarketplaceApp<L, P, Q, S, I>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<SetPlanRequest>,
) -> Response
where
    L: ListingRepository + 'static,
    P: ProfileRepository + 'static,
    Q: PaymentRepository + 'static,
    S: ImageStore + 'static,
    I: IdentityProvider + 'static,
{
    let admin = match authenticate(&app, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match app
        .marketplace
        .set_plan(&admin, &SellerId(id), request.tier, request.credits)
    {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => payment_error(err),
    }
}

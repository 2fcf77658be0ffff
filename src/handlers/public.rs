use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{crud, AppState};
use crate::{
    db::Key,
    dto::{NewInquiry, NewTestimonial, Resource},
    error::ApiError,
    models::{BlogPost, EventType, Inquiry, Package, PortfolioItem, Testimonial},
};

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let source = state.store.kind();
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "dataSource": source }))),
        Err(err) => {
            error!("health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "dataSource": source })),
            )
        }
    }
}

/// Featured items first, then by sort order.
pub async fn list_portfolio(State(state): State<AppState>) -> Result<Json<Vec<PortfolioItem>>, ApiError> {
    let mut items = state.store.list::<PortfolioItem>().await?;
    items.sort_by(|a, b| b.featured.cmp(&a.featured).then(a.sort_order.cmp(&b.sort_order)));
    Ok(Json(items))
}

pub async fn show_portfolio_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PortfolioItem>, ApiError> {
    state
        .store
        .get::<PortfolioItem>(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("portfolio item"))
}

pub async fn list_testimonials(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>, ApiError> {
    let testimonials = state.store.list::<Testimonial>().await?;
    Ok(Json(testimonials.into_iter().filter(|t| t.approved).collect()))
}

// Submissions wait for an admin to approve them.
pub async fn submit_testimonial(
    State(state): State<AppState>,
    Json(input): Json<NewTestimonial>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    input.validate()?;
    let mut testimonial = Testimonial::build(input, Utc::now())?;
    testimonial.approved = false;
    let testimonial = state.store.insert(&testimonial).await?;
    info!("received testimonial {}", testimonial.id);
    Ok((StatusCode::CREATED, Json(testimonial)))
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let mut posts: Vec<BlogPost> = state
        .store
        .list::<BlogPost>()
        .await?
        .into_iter()
        .filter(|post| post.published)
        .collect();
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    Ok(Json(posts))
}

pub async fn show_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    state
        .store
        .find_by::<BlogPost>("slug", Key::Text(&slug))
        .await?
        .filter(|post| post.published)
        .map(Json)
        .ok_or(ApiError::NotFound("blog post"))
}

pub async fn list_event_types(State(state): State<AppState>) -> Result<Json<Vec<EventType>>, ApiError> {
    let mut event_types = state.store.list::<EventType>().await?;
    event_types.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(event_types))
}

pub async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<Package>>, ApiError> {
    let mut packages = state.store.list::<Package>().await?;
    packages.sort_by(|a, b| a.price.cmp(&b.price));
    Ok(Json(packages))
}

pub async fn submit_inquiry(
    State(state): State<AppState>,
    Json(input): Json<NewInquiry>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    let inquiry = crud::insert_new::<Inquiry>(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

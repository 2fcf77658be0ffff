use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::{
    auth::AdminContext,
    db::Store,
    dto::{Reference, Resource},
    error::ApiError,
    models::{Booking, EventType, Inquiry, Package, User},
};

pub async fn ensure_references(store: &Store, references: &[Reference]) -> Result<(), ApiError> {
    for reference in references {
        let (kind, id, exists) = match *reference {
            Reference::User(id) => ("user", id, store.get::<User>(id).await?.is_some()),
            Reference::Inquiry(id) => ("inquiry", id, store.get::<Inquiry>(id).await?.is_some()),
            Reference::EventType(id) => ("event type", id, store.get::<EventType>(id).await?.is_some()),
            Reference::Package(id) => ("package", id, store.get::<Package>(id).await?.is_some()),
            Reference::Booking(id) => ("booking", id, store.get::<Booking>(id).await?.is_some()),
        };
        if !exists {
            return Err(ApiError::UnknownReference { kind, id });
        }
    }
    Ok(())
}

pub async fn insert_new<T: Resource>(store: &Store, input: T::Create) -> Result<T, ApiError> {
    input.validate()?;
    let row = T::build(input, Utc::now())?;
    ensure_references(store, &row.references()).await?;
    let row = store.insert(&row).await?;
    info!("created {} {}", T::NAME, row.id());
    Ok(row)
}

pub async fn apply_update<T: Resource>(store: &Store, id: Uuid, input: T::Update) -> Result<T, ApiError> {
    input.validate()?;
    let mut row = store.get::<T>(id).await?.ok_or(ApiError::NotFound(T::NAME))?;
    row.apply(input, Utc::now())?;
    ensure_references(store, &row.references()).await?;
    let row = store.update(&row).await?.ok_or(ApiError::NotFound(T::NAME))?;
    info!("updated {} {}", T::NAME, id);
    Ok(row)
}

pub async fn list<T: Resource>(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<Vec<T>>, ApiError> {
    Ok(Json(state.store.list::<T>().await?))
}

pub async fn show<T: Resource>(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<T>, ApiError> {
    state
        .store
        .get::<T>(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(T::NAME))
}

pub async fn create<T: Resource>(
    State(state): State<AppState>,
    _admin: AdminContext,
    Json(input): Json<T::Create>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let row = insert_new::<T>(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update<T: Resource>(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(input): Json<T::Update>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(apply_update::<T>(&state.store, id, input).await?))
}

pub async fn remove<T: Resource>(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete::<T>(id).await? {
        info!("deleted {} {}", T::NAME, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(T::NAME))
    }
}

pub fn routes<T: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<T>).post(create::<T>))
        .route(
            "/:id",
            get(show::<T>)
                .put(update::<T>)
                .patch(update::<T>)
                .delete(remove::<T>),
        )
}

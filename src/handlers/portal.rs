use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::{
    bookings::{load_view, load_views, BookingView},
    galleries::{photos_of, PhotoView},
    AppState,
};
use crate::{
    auth::AuthContext,
    db::{Key, StoreError},
    error::ApiError,
    models::{Booking, Gallery, GalleryStatus, Payment, User},
};

async fn own_bookings(state: &AppState, client_id: Uuid) -> Result<Vec<Booking>, StoreError> {
    state
        .store
        .list_by::<Booking>("client_id", Key::Id(client_id))
        .await
}

async fn own_booking(state: &AppState, auth: &AuthContext, id: Uuid) -> Result<Booking, ApiError> {
    match state.store.get::<Booking>(id).await? {
        Some(booking) if booking.client_id == Some(auth.user.id) => Ok(booking),
        _ => Err(ApiError::NotFound("booking")),
    }
}

// Clients only see galleries that are published and attached to their bookings.
async fn own_galleries(state: &AppState, client_id: Uuid) -> Result<Vec<Gallery>, StoreError> {
    let booking_ids: HashSet<Uuid> = own_bookings(state, client_id)
        .await?
        .into_iter()
        .map(|booking| booking.id)
        .collect();
    Ok(state
        .store
        .list::<Gallery>()
        .await?
        .into_iter()
        .filter(|gallery| gallery.status == GalleryStatus::Published)
        .filter(|gallery| gallery.booking_id.is_some_and(|id| booking_ids.contains(&id)))
        .collect())
}

pub async fn me(auth: AuthContext) -> Json<User> {
    Json(auth.user)
}

pub async fn my_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<BookingView>>, ApiError> {
    let bookings = own_bookings(&state, auth.user.id).await?;
    Ok(Json(load_views(&state.store, bookings).await?))
}

pub async fn my_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, ApiError> {
    let booking = own_booking(&state, &auth, id).await?;
    Ok(Json(load_view(&state.store, booking).await?))
}

pub async fn my_galleries(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Gallery>>, ApiError> {
    Ok(Json(own_galleries(&state, auth.user.id).await?))
}

pub async fn my_gallery_photos(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PhotoView>>, ApiError> {
    let visible = own_galleries(&state, auth.user.id)
        .await?
        .into_iter()
        .any(|gallery| gallery.id == id);
    if !visible {
        return Err(ApiError::NotFound("gallery"));
    }
    Ok(Json(photos_of(&state, id).await?))
}

pub async fn my_payments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let mut payments = Vec::new();
    for booking in own_bookings(&state, auth.user.id).await? {
        payments.extend(
            state
                .store
                .list_by::<Payment>("booking_id", Key::Id(booking.id))
                .await?,
        );
    }
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(payments))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::{
        dto::Resource,
        handlers::{crud, testing::fixture},
        models::Photo,
    };

    async fn booking_for(state: &AppState, client_id: Uuid) -> Booking {
        crud::insert_new::<Booking>(
            &state.store,
            serde_json::from_value(json!({
                "clientId": client_id,
                "title": "Family session",
                "packagePrice": 600,
                "depositAmount": 100,
            }))
            .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn gallery_for(state: &AppState, booking_id: Uuid, status: &str) -> Gallery {
        let gallery = Gallery::build(
            serde_json::from_value(json!({
                "bookingId": booking_id,
                "title": "Family session",
                "status": status,
            }))
            .unwrap(),
            Utc::now(),
        )
        .unwrap();
        state.store.insert(&gallery).await.unwrap()
    }

    #[tokio::test]
    async fn clients_see_only_their_bookings() {
        let fx = fixture().await;
        let mine = booking_for(&fx.state, fx.client.id).await;
        let other = fx.other_client().await;
        booking_for(&fx.state, other.user.id).await;

        let Json(views) = my_bookings(State(fx.state.clone()), fx.client()).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].booking.id, mine.id);

        let err = my_booking(State(fx.state.clone()), other, Path(mine.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("booking")));
    }

    #[tokio::test]
    async fn draft_galleries_stay_hidden() {
        let fx = fixture().await;
        let booking = booking_for(&fx.state, fx.client.id).await;
        let draft = gallery_for(&fx.state, booking.id, "draft").await;
        let published = gallery_for(&fx.state, booking.id, "published").await;
        let photo = Photo {
            id: Uuid::new_v4(),
            gallery_id: published.id,
            storage_key: "family/1.jpg".to_string(),
            caption: None,
            sort_order: 0,
            created_at: Utc::now(),
        };
        fx.state.store.insert(&photo).await.unwrap();

        let Json(galleries) = my_galleries(State(fx.state.clone()), fx.client()).await.unwrap();
        assert_eq!(galleries.len(), 1);
        assert_eq!(galleries[0].id, published.id);

        let Json(photos) = my_gallery_photos(State(fx.state.clone()), fx.client(), Path(published.id))
            .await
            .unwrap();
        assert_eq!(photos[0].url, "https://cdn.example.com/photos/family/1.jpg");

        let err = my_gallery_photos(State(fx.state.clone()), fx.client(), Path(draft.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("gallery")));
    }

    #[tokio::test]
    async fn payments_are_scoped_to_own_bookings() {
        let fx = fixture().await;
        let mine = booking_for(&fx.state, fx.client.id).await;
        let other = fx.other_client().await;
        let theirs = booking_for(&fx.state, other.user.id).await;
        for booking_id in [mine.id, theirs.id] {
            crud::insert_new::<Payment>(
                &fx.state.store,
                serde_json::from_value(json!({ "bookingId": booking_id, "amount": 100 })).unwrap(),
            )
            .await
            .unwrap();
        }

        let Json(payments) = my_payments(State(fx.state.clone()), fx.client()).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].booking_id, mine.id);
    }
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::{
    auth::AdminContext,
    db::{Key, StoreError},
    dto::NewPhoto,
    error::ApiError,
    models::{Gallery, Photo},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    #[serde(flatten)]
    pub photo: Photo,
    pub url: String,
}

/// Photos of a gallery in display order.
pub async fn photos_of(state: &AppState, gallery_id: Uuid) -> Result<Vec<PhotoView>, StoreError> {
    let mut photos = state
        .store
        .list_by::<Photo>("gallery_id", Key::Id(gallery_id))
        .await?;
    photos.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then(a.created_at.cmp(&b.created_at))
    });
    Ok(photos
        .into_iter()
        .map(|photo| PhotoView {
            url: state.photo_url(&photo.storage_key),
            photo,
        })
        .collect())
}

async fn find_gallery(state: &AppState, id: Uuid) -> Result<Gallery, ApiError> {
    state
        .store
        .get::<Gallery>(id)
        .await?
        .ok_or(ApiError::NotFound("gallery"))
}

pub async fn list_photos(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PhotoView>>, ApiError> {
    let gallery = find_gallery(&state, id).await?;
    Ok(Json(photos_of(&state, gallery.id).await?))
}

pub async fn add_photo(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(input): Json<NewPhoto>,
) -> Result<(StatusCode, Json<PhotoView>), ApiError> {
    input.validate()?;
    let gallery = find_gallery(&state, id).await?;
    let photo = input.into_photo(gallery.id, Utc::now())?;
    let photo = state.store.insert(&photo).await?;
    info!("added photo {} to gallery {}", photo.id, gallery.id);
    let url = state.photo_url(&photo.storage_key);
    Ok((StatusCode::CREATED, Json(PhotoView { photo, url })))
}

pub async fn remove_photo(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete::<Photo>(id).await? {
        info!("deleted photo {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("photo"))
    }
}

// The in-memory store has no cascades, so photos go first.
pub async fn remove_gallery(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let gallery = find_gallery(&state, id).await?;
    let photos = state
        .store
        .list_by::<Photo>("gallery_id", Key::Id(gallery.id))
        .await?;
    for photo in &photos {
        state.store.delete::<Photo>(photo.id).await?;
    }
    state.store.delete::<Gallery>(gallery.id).await?;
    info!("deleted gallery {} with {} photos", gallery.id, photos.len());
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{dto::Resource, handlers::testing::fixture};

    async fn gallery(state: &AppState) -> Gallery {
        let gallery = Gallery::build(
            serde_json::from_value(json!({ "title": "Beach session" })).unwrap(),
            Utc::now(),
        )
        .unwrap();
        state.store.insert(&gallery).await.unwrap()
    }

    fn photo(key: &str, sort_order: i32) -> Json<NewPhoto> {
        Json(
            serde_json::from_value(json!({ "storageKey": key, "sortOrder": sort_order }))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn photos_are_ordered_and_carry_urls() {
        let fx = fixture().await;
        let gallery = gallery(&fx.state).await;
        for (key, order) in [("b.jpg", 2), ("/a.jpg", 1)] {
            let (status, _) = add_photo(State(fx.state.clone()), fx.admin(), Path(gallery.id), photo(key, order))
                .await
                .unwrap();
            assert_eq!(status, StatusCode::CREATED);
        }

        let Json(photos) = list_photos(State(fx.state.clone()), fx.admin(), Path(gallery.id))
            .await
            .unwrap();
        let urls: Vec<_> = photos.iter().map(|view| view.url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://cdn.example.com/photos/a.jpg", "https://cdn.example.com/photos/b.jpg"]
        );
    }

    #[tokio::test]
    async fn photo_for_missing_gallery_is_not_found() {
        let fx = fixture().await;
        let err = add_photo(State(fx.state.clone()), fx.admin(), Path(Uuid::new_v4()), photo("a.jpg", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("gallery")));
    }

    #[tokio::test]
    async fn removing_a_gallery_removes_its_photos() {
        let fx = fixture().await;
        let gallery = gallery(&fx.state).await;
        let (_, Json(added)) = add_photo(State(fx.state.clone()), fx.admin(), Path(gallery.id), photo("a.jpg", 0))
            .await
            .unwrap();

        let status = remove_gallery(State(fx.state.clone()), fx.admin(), Path(gallery.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(fx.state.store.get::<Photo>(added.photo.id).await.unwrap().is_none());

        let err = remove_photo(State(fx.state.clone()), fx.admin(), Path(added.photo.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("photo")));
    }

    #[tokio::test]
    async fn keys_outside_the_photo_base_are_rejected() {
        let fx = fixture().await;
        let gallery = gallery(&fx.state).await;
        for key in ["https://other.host/x.jpg", "../../private/x.jpg"] {
            let err = add_photo(State(fx.state.clone()), fx.admin(), Path(gallery.id), photo(key, 0))
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{key}");
        }
        assert!(photos_of(&fx.state, gallery.id).await.unwrap().is_empty());
    }
}

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{crud, AppState};
use crate::{
    auth::AdminContext,
    db::{Key, Store, StoreError},
    dto::{BookingPatch, ConvertInquiry, NewBooking},
    error::ApiError,
    lifecycle::{derive_stage, LifecycleInput, LifecycleStage},
    models::{Booking, Gallery, Inquiry, InquiryStatus, Package, Payment, User},
};

/// A booking with its derived stage and money totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub stage: LifecycleStage,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,
    pub payments: Vec<Payment>,
    pub galleries: Vec<Gallery>,
}

impl BookingView {
    pub fn assemble(booking: Booking, payments: Vec<Payment>, galleries: Vec<Gallery>) -> Self {
        let stage = derive_stage(&LifecycleInput::from_records(&booking, &payments, &galleries));
        let paid_amount: Decimal = payments
            .iter()
            .filter(|payment| payment.counts_toward_paid())
            .map(|payment| payment.amount)
            .sum();
        let balance_due = (booking.package_price - paid_amount).max(Decimal::ZERO);
        BookingView {
            booking,
            stage,
            paid_amount,
            balance_due,
            payments,
            galleries,
        }
    }

    pub fn lifecycle_input(&self) -> LifecycleInput {
        LifecycleInput::from_records(&self.booking, &self.payments, &self.galleries)
    }
}

pub async fn load_view(store: &Store, booking: Booking) -> Result<BookingView, StoreError> {
    let payments = store.list_by::<Payment>("booking_id", Key::Id(booking.id)).await?;
    let galleries = store.list_by::<Gallery>("booking_id", Key::Id(booking.id)).await?;
    Ok(BookingView::assemble(booking, payments, galleries))
}

/// Builds views for many bookings with one pass over payments and galleries.
pub async fn load_views(store: &Store, bookings: Vec<Booking>) -> Result<Vec<BookingView>, StoreError> {
    let mut payments: HashMap<Uuid, Vec<Payment>> = HashMap::new();
    for payment in store.list::<Payment>().await? {
        payments.entry(payment.booking_id).or_default().push(payment);
    }
    let mut galleries: HashMap<Uuid, Vec<Gallery>> = HashMap::new();
    for gallery in store.list::<Gallery>().await? {
        if let Some(booking_id) = gallery.booking_id {
            galleries.entry(booking_id).or_default().push(gallery);
        }
    }
    Ok(bookings
        .into_iter()
        .map(|booking| {
            let payments = payments.remove(&booking.id).unwrap_or_default();
            let galleries = galleries.remove(&booking.id).unwrap_or_default();
            BookingView::assemble(booking, payments, galleries)
        })
        .collect())
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub stage: Option<LifecycleStage>,
    pub q: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, view: &BookingView) -> bool {
        if self.stage.is_some_and(|stage| stage != view.stage) {
            return false;
        }
        let Some(needle) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        let booking = &view.booking;
        booking.title.to_lowercase().contains(&needle)
            || booking
                .location
                .as_deref()
                .is_some_and(|location| location.to_lowercase().contains(&needle))
    }
}

async fn find_booking(store: &Store, id: Uuid) -> Result<Booking, ApiError> {
    store.get::<Booking>(id).await?.ok_or(ApiError::NotFound("booking"))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminContext,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<BookingView>>, ApiError> {
    let bookings = state.store.list::<Booking>().await?;
    let views = load_views(&state.store, bookings).await?;
    Ok(Json(views.into_iter().filter(|view| filter.matches(view)).collect()))
}

pub async fn show(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, ApiError> {
    let booking = find_booking(&state.store, id).await?;
    Ok(Json(load_view(&state.store, booking).await?))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminContext,
    Json(input): Json<NewBooking>,
) -> Result<(StatusCode, Json<BookingView>), ApiError> {
    let booking = crud::insert_new::<Booking>(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(load_view(&state.store, booking).await?)))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(input): Json<BookingPatch>,
) -> Result<Json<BookingView>, ApiError> {
    let booking = crud::apply_update::<Booking>(&state.store, id, input).await?;
    Ok(Json(load_view(&state.store, booking).await?))
}

// Bookings are never removed; deleting one cancels it.
pub async fn cancel(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, ApiError> {
    let mut booking = find_booking(&state.store, id).await?;
    booking.status = Some(LifecycleStage::Cancelled.as_str().to_string());
    booking.updated_at = Utc::now();
    let booking = state
        .store
        .update(&booking)
        .await?
        .ok_or(ApiError::NotFound("booking"))?;
    info!("cancelled booking {}", id);
    Ok(Json(load_view(&state.store, booking).await?))
}

pub async fn convert_inquiry(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(input): Json<ConvertInquiry>,
) -> Result<(StatusCode, Json<BookingView>), ApiError> {
    input.validate()?;
    let store = &state.store;
    let mut inquiry = store.get::<Inquiry>(id).await?.ok_or(ApiError::NotFound("inquiry"))?;
    if inquiry.status == InquiryStatus::Booked {
        return Err(ApiError::Conflict(format!("inquiry {id} already converted")));
    }

    let package = match input.package_id {
        Some(package_id) => Some(
            store
                .get::<Package>(package_id)
                .await?
                .ok_or(ApiError::UnknownReference { kind: "package", id: package_id })?,
        ),
        None => None,
    };
    let client_id = match input.client_id {
        Some(client_id) => Some(client_id),
        None => store
            .find_by::<User>("email", Key::Text(&inquiry.email))
            .await?
            .map(|user| user.id),
    };
    let package_price = input
        .package_price
        .or_else(|| package.as_ref().and_then(|package| package.price.to_f64()))
        .unwrap_or(0.0);
    let title = input.title.unwrap_or_else(|| match &inquiry.event_type {
        Some(event_type) => format!("{} ({})", inquiry.name, event_type),
        None => inquiry.name.clone(),
    });

    let new_booking = NewBooking {
        client_id,
        package_id: input.package_id,
        inquiry_id: Some(inquiry.id),
        title,
        event_date: inquiry.event_date,
        location: None,
        package_price,
        deposit_amount: input.deposit_amount.unwrap_or(0.0),
        status: None,
        notes: Some(inquiry.message.clone()),
    };

    // The inquiry is claimed before the insert and released if the insert fails.
    let previous = inquiry.status;
    inquiry.status = InquiryStatus::Booked;
    let mut inquiry = store
        .update(&inquiry)
        .await?
        .ok_or(ApiError::NotFound("inquiry"))?;
    let booking = match crud::insert_new::<Booking>(store, new_booking).await {
        Ok(booking) => booking,
        Err(err) => {
            inquiry.status = previous;
            if let Err(restore_err) = store.update(&inquiry).await {
                error!("could not release inquiry {}: {}", id, restore_err);
            }
            return Err(err);
        }
    };
    info!("converted inquiry {} into booking {}", id, booking.id);
    Ok((StatusCode::CREATED, Json(load_view(store, booking).await?)))
}

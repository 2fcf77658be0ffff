use std::collections::BTreeMap;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{
    bookings::{load_views, BookingView},
    AppState,
};
use crate::{
    auth::AdminContext,
    error::ApiError,
    lifecycle::{status_drifted, LifecycleStage},
    models::{Booking, Inquiry, InquiryStatus},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stage_counts: BTreeMap<&'static str, usize>,
    pub collected: Decimal,
    pub outstanding: Decimal,
    pub open_inquiries: usize,
    /// Bookings whose stored status disagrees with what their payments and galleries imply.
    pub status_drift: Vec<Uuid>,
}

pub fn summarize(views: &[BookingView], inquiries: &[Inquiry], now: DateTime<Utc>) -> Dashboard {
    let mut stage_counts: BTreeMap<&'static str, usize> =
        LifecycleStage::ALL.iter().map(|stage| (stage.as_str(), 0)).collect();
    let mut collected = Decimal::ZERO;
    let mut outstanding = Decimal::ZERO;
    let mut status_drift = Vec::new();

    for view in views {
        *stage_counts.entry(view.stage.as_str()).or_default() += 1;
        collected += view.paid_amount;
        if view.stage != LifecycleStage::Cancelled {
            outstanding += view.balance_due;
        }
        if status_drifted(&view.lifecycle_input(), now) {
            status_drift.push(view.booking.id);
        }
    }

    let open_inquiries = inquiries
        .iter()
        .filter(|inquiry| matches!(inquiry.status, InquiryStatus::New | InquiryStatus::Contacted))
        .count();

    Dashboard {
        stage_counts,
        collected,
        outstanding,
        open_inquiries,
        status_drift,
    }
}

pub async fn dashboard(State(state): State<AppState>, _admin: AdminContext) -> Result<Json<Dashboard>, ApiError> {
    let bookings = state.store.list::<Booking>().await?;
    let views = load_views(&state.store, bookings).await?;
    let inquiries = state.store.list::<Inquiry>().await?;
    let summary = summarize(&views, &inquiries, Utc::now());
    if !summary.status_drift.is_empty() {
        warn!("{} bookings have a stored status that disagrees with their payments", summary.status_drift.len());
    }
    Ok(Json(summary))
}

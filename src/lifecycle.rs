//! Booking lifecycle stage derivation.
//!
//! A persisted `status` always wins. Rows without a recognized status get a
//! stage inferred from their payments, event date and galleries. Every field
//! is read leniently so partially populated or legacy rows never fail.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Booking, Gallery, GalleryStatus, Payment, PaymentStatus};

// Absorbs floating-point rounding when comparing paid totals.
const AMOUNT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    PendingDeposit,
    Upcoming,
    PendingFullPayment,
    PendingDelivery,
    Completed,
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown lifecycle stage `{0}`")]
pub struct UnknownStage(pub String);

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 6] = [
        LifecycleStage::PendingDeposit,
        LifecycleStage::Upcoming,
        LifecycleStage::PendingFullPayment,
        LifecycleStage::PendingDelivery,
        LifecycleStage::Completed,
        LifecycleStage::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::PendingDeposit => "pending_deposit",
            LifecycleStage::Upcoming => "upcoming",
            LifecycleStage::PendingFullPayment => "pending_full_payment",
            LifecycleStage::PendingDelivery => "pending_delivery",
            LifecycleStage::Completed => "completed",
            LifecycleStage::Cancelled => "cancelled",
        }
    }

    /// Maps a canonical or legacy status string onto the current vocabulary.
    pub fn normalize(raw: &str) -> Option<Self> {
        if let Ok(stage) = raw.parse::<LifecycleStage>() {
            return Some(stage);
        }
        match raw {
            "confirmed" => Some(LifecycleStage::Upcoming),
            "in_progress" => Some(LifecycleStage::PendingFullPayment),
            "editing" => Some(LifecycleStage::PendingDelivery),
            "delivered" => Some(LifecycleStage::Completed),
            _ => None,
        }
    }
}

impl FromStr for LifecycleStage {
    type Err = UnknownStage;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        LifecycleStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == raw)
            .ok_or_else(|| UnknownStage(raw.to_string()))
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentSignal {
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GallerySignal {
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

/// Everything the derivation looks at. Deserializes from the camelCase
/// booking shape used by the clients, tolerating wrong types everywhere.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleInput {
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub lifecycle_stage: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_amount")]
    pub deposit_amount: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub package_price: f64,
    #[serde(deserialize_with = "lenient_list")]
    pub payments: Vec<PaymentSignal>,
    #[serde(deserialize_with = "lenient_list")]
    pub galleries: Vec<GallerySignal>,
}

impl LifecycleInput {
    pub fn from_records(booking: &Booking, payments: &[Payment], galleries: &[Gallery]) -> Self {
        LifecycleInput {
            status: booking.status.clone(),
            lifecycle_stage: booking.lifecycle_stage.clone(),
            event_date: booking
                .event_date
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|at| at.and_utc()),
            deposit_amount: booking.deposit_amount.to_f64().unwrap_or(0.0),
            package_price: booking.package_price.to_f64().unwrap_or(0.0),
            payments: payments
                .iter()
                .map(|payment| PaymentSignal {
                    amount: payment.amount.to_f64().unwrap_or(0.0),
                    status: Some(payment.status.clone()),
                })
                .collect(),
            galleries: galleries
                .iter()
                .map(|gallery| GallerySignal {
                    status: Some(gallery.status.as_str().to_string()),
                })
                .collect(),
        }
    }

    fn explicit_stage(&self) -> Option<LifecycleStage> {
        self.status.as_deref().and_then(LifecycleStage::normalize)
    }

    fn hint(&self) -> Option<LifecycleStage> {
        self.lifecycle_stage.as_deref().and_then(LifecycleStage::normalize)
    }
}

pub fn paid_amount(payments: &[PaymentSignal]) -> f64 {
    payments
        .iter()
        .filter(|payment| {
            payment
                .status
                .as_deref()
                .and_then(PaymentStatus::normalize)
                .is_some_and(|status| status.counts_toward_paid())
        })
        .map(|payment| payment.amount)
        .sum()
}

pub fn derive_stage(input: &LifecycleInput) -> LifecycleStage {
    derive_stage_at(input, Utc::now())
}

pub fn derive_stage_at(input: &LifecycleInput, now: DateTime<Utc>) -> LifecycleStage {
    let hint = input.hint();
    if let Some(stage) = input.explicit_stage().or(hint) {
        return stage;
    }
    infer_stage_at(input, hint, now)
}

/// The signal-based half of the derivation. `hint` only breaks ties inside
/// the unpaid and delivery branches.
pub fn infer_stage_at(
    input: &LifecycleInput,
    hint: Option<LifecycleStage>,
    now: DateTime<Utc>,
) -> LifecycleStage {
    let paid = paid_amount(&input.payments);
    let deposit_satisfied =
        input.deposit_amount <= 0.0 || paid + AMOUNT_TOLERANCE >= input.deposit_amount;
    let fully_paid = input.package_price <= 0.0 || paid + AMOUNT_TOLERANCE >= input.package_price;
    let event_has_passed = input
        .event_date
        .is_some_and(|at| at.timestamp_millis() > 0 && at < now);
    let has_published_gallery = input
        .galleries
        .iter()
        .any(|gallery| gallery.status.as_deref() == Some(GalleryStatus::Published.as_str()));

    if !deposit_satisfied {
        return LifecycleStage::PendingDeposit;
    }
    if !fully_paid {
        if hint == Some(LifecycleStage::PendingFullPayment) || event_has_passed {
            return LifecycleStage::PendingFullPayment;
        }
        return LifecycleStage::Upcoming;
    }
    if has_published_gallery {
        return LifecycleStage::Completed;
    }
    if hint == Some(LifecycleStage::PendingDelivery) || event_has_passed {
        return LifecycleStage::PendingDelivery;
    }
    LifecycleStage::Upcoming
}

/// True when the persisted status no longer agrees with what the signals say.
/// Cancelled bookings never drift.
pub fn status_drifted(input: &LifecycleInput, now: DateTime<Utc>) -> bool {
    match input.explicit_stage() {
        Some(LifecycleStage::Cancelled) | None => false,
        Some(stage) => stage != infer_stage_at(input, input.hint(), now),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let amount = match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|amount| amount.is_finite()).unwrap_or(0.0))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => parse_timestamp(text.trim()),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|at| at.and_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|at| at.and_utc())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn stage(value: Value) -> LifecycleStage {
        let input: LifecycleInput = serde_json::from_value(value).unwrap();
        derive_stage_at(&input, now())
    }

    fn future() -> String {
        (now() + Duration::days(30)).to_rfc3339()
    }

    fn past() -> String {
        (now() - Duration::days(30)).to_rfc3339()
    }

    #[test]
    fn malformed_input_still_yields_a_stage() {
        let shapes = [
            json!({}),
            json!({ "payments": null, "galleries": null, "eventDate": null }),
            json!({ "depositAmount": "abc", "packagePrice": "n/a" }),
            json!({ "depositAmount": {}, "packagePrice": [1, 2] }),
            json!({ "payments": "none", "galleries": 7 }),
            json!({ "payments": [null, 5, { "amount": "x", "status": 3 }] }),
            json!({ "eventDate": "not a date", "status": 42 }),
            json!({ "eventDate": true, "lifecycleStage": ["upcoming"] }),
        ];
        for shape in shapes {
            let result = stage(shape.clone());
            assert!(LifecycleStage::ALL.contains(&result), "{shape}");
        }
    }

    #[test]
    fn empty_booking_is_upcoming() {
        assert_eq!(stage(json!({})), LifecycleStage::Upcoming);
    }

    #[test]
    fn explicit_status_wins_over_signals() {
        let result = stage(json!({
            "status": "completed",
            "depositAmount": 1000,
            "packagePrice": 5000,
            "payments": [],
            "eventDate": future(),
        }));
        assert_eq!(result, LifecycleStage::Completed);
    }

    #[test]
    fn legacy_statuses_are_aliased() {
        assert_eq!(stage(json!({ "status": "confirmed" })), LifecycleStage::Upcoming);
        assert_eq!(stage(json!({ "status": "delivered" })), LifecycleStage::Completed);
        assert_eq!(stage(json!({ "status": "editing" })), LifecycleStage::PendingDelivery);
        assert_eq!(
            stage(json!({ "status": "in_progress" })),
            LifecycleStage::PendingFullPayment
        );
    }

    #[test]
    fn lifecycle_stage_used_when_status_unrecognized() {
        let result = stage(json!({
            "status": "archived_2019",
            "lifecycleStage": "pending_delivery",
            "depositAmount": 1000,
        }));
        assert_eq!(result, LifecycleStage::PendingDelivery);
    }

    #[test]
    fn status_checked_before_lifecycle_stage() {
        let result = stage(json!({ "status": "cancelled", "lifecycleStage": "completed" }));
        assert_eq!(result, LifecycleStage::Cancelled);
    }

    #[test]
    fn unpaid_deposit_is_pending_deposit() {
        let result = stage(json!({
            "depositAmount": 1000,
            "packagePrice": 5000,
            "payments": [],
        }));
        assert_eq!(result, LifecycleStage::PendingDeposit);
    }

    #[test]
    fn deposit_paid_future_event_is_upcoming() {
        let result = stage(json!({
            "depositAmount": 1000,
            "packagePrice": 5000,
            "payments": [{ "amount": 1000, "status": "succeeded" }],
            "eventDate": future(),
        }));
        assert_eq!(result, LifecycleStage::Upcoming);
    }

    #[test]
    fn deposit_paid_past_event_is_pending_full_payment() {
        let result = stage(json!({
            "depositAmount": 1000,
            "packagePrice": 5000,
            "payments": [{ "amount": 1000, "status": "succeeded" }],
            "eventDate": past(),
        }));
        assert_eq!(result, LifecycleStage::PendingFullPayment);
    }

    #[test]
    fn published_gallery_completes_even_before_event() {
        let result = stage(json!({
            "packagePrice": 5000,
            "payments": [{ "amount": 5000, "status": "succeeded" }],
            "galleries": [{ "status": "draft" }, { "status": "published" }],
            "eventDate": future(),
        }));
        assert_eq!(result, LifecycleStage::Completed);
    }

    #[test]
    fn fully_paid_without_gallery_depends_on_event_date() {
        let paid = json!([{ "amount": "5000", "status": "paid" }]);
        let before = stage(json!({ "packagePrice": 5000, "payments": paid.clone(), "eventDate": future() }));
        let after = stage(json!({ "packagePrice": 5000, "payments": paid, "eventDate": past() }));
        assert_eq!(before, LifecycleStage::Upcoming);
        assert_eq!(after, LifecycleStage::PendingDelivery);
    }

    #[test]
    fn rounding_within_tolerance_satisfies_deposit() {
        let result = stage(json!({
            "depositAmount": 1000,
            "payments": [{ "amount": 999.999, "status": "succeeded" }],
        }));
        assert_eq!(result, LifecycleStage::Upcoming);
    }

    #[test]
    fn only_settled_payments_count() {
        let result = stage(json!({
            "depositAmount": 500,
            "payments": [
                { "amount": 500, "status": "pending" },
                { "amount": 500, "status": "refunded" },
                { "amount": 500, "status": "failed" },
            ],
        }));
        assert_eq!(result, LifecycleStage::PendingDeposit);
    }

    #[test]
    fn plain_dates_and_epoch_millis_parse() {
        let input: LifecycleInput =
            serde_json::from_value(json!({ "eventDate": "2026-05-01" })).unwrap();
        assert_eq!(
            input.event_date,
            Some(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap())
        );

        let input: LifecycleInput =
            serde_json::from_value(json!({ "eventDate": 1_000 })).unwrap();
        assert_eq!(input.event_date.map(|at| at.timestamp_millis()), Some(1_000));

        // The epoch itself is not a positive timestamp.
        let epoch = stage(json!({ "packagePrice": 100, "depositAmount": 0, "eventDate": 0 }));
        assert_eq!(epoch, LifecycleStage::Upcoming);
    }

    #[test]
    fn hint_breaks_ties_in_inference() {
        let input: LifecycleInput = serde_json::from_value(json!({
            "packagePrice": 5000,
            "payments": [{ "amount": 1000, "status": "succeeded" }],
            "eventDate": future(),
        }))
        .unwrap();
        assert_eq!(
            infer_stage_at(&input, Some(LifecycleStage::PendingFullPayment), now()),
            LifecycleStage::PendingFullPayment
        );
        assert_eq!(infer_stage_at(&input, None, now()), LifecycleStage::Upcoming);
    }

    #[test]
    fn drift_detects_stale_status() {
        let input: LifecycleInput = serde_json::from_value(json!({
            "status": "completed",
            "packagePrice": 5000,
            "payments": [],
        }))
        .unwrap();
        assert!(status_drifted(&input, now()));

        let cancelled: LifecycleInput =
            serde_json::from_value(json!({ "status": "cancelled", "packagePrice": 5000 })).unwrap();
        assert!(!status_drifted(&cancelled, now()));
    }

    #[test]
    fn from_str_accepts_only_canonical_names() {
        assert_eq!("upcoming".parse::<LifecycleStage>(), Ok(LifecycleStage::Upcoming));
        assert_eq!(
            "confirmed".parse::<LifecycleStage>(),
            Err(UnknownStage("confirmed".to_string()))
        );
        for stage in LifecycleStage::ALL {
            assert_eq!(stage.to_string().parse::<LifecycleStage>(), Ok(stage));
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{Key, PgQueryAs, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "inquiry_status", rename_all = "snake_case")]
pub enum InquiryStatus {
    New,
    Contacted,
    Booked,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "gallery_status", rename_all = "snake_case")]
pub enum GalleryStatus {
    Draft,
    Published,
    Archived,
}

impl GalleryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GalleryStatus::Draft => "draft",
            GalleryStatus::Published => "published",
            GalleryStatus::Archived => "archived",
        }
    }
}

// Stored as text: rows written by the payment processor may still carry `paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn normalize(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "succeeded" | "paid" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    pub fn counts_toward_paid(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub event_type_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub inquiry_id: Option<Uuid>,
    pub title: String,
    pub event_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub package_price: Decimal,
    pub deposit_amount: Decimal,
    // Raw text; older rows use the confirmed/in_progress/editing/delivered vocabulary.
    pub status: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub status: String,
    pub method: Option<String>,
    pub provider_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn counts_toward_paid(&self) -> bool {
        PaymentStatus::normalize(&self.status).is_some_and(|status| status.counts_toward_paid())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub title: String,
    pub status: GalleryStatus,
    pub cover_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub gallery_id: Uuid,
    pub storage_key: String,
    pub caption: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub image_url: String,
    pub description: Option<String>,
    pub featured: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: Uuid,
    pub client_name: String,
    pub quote: String,
    pub rating: i32,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] =
        &["id", "email", "full_name", "phone", "role", "created_at"];
    const UNIQUE: &'static [&'static str] = &["email"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.email.clone())
            .bind(self.full_name.clone())
            .bind(self.phone.clone())
            .bind(self.role)
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "email" => Some(Key::Text(&self.email)),
            _ => None,
        }
    }
}

impl Record for Inquiry {
    const TABLE: &'static str = "inquiries";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "event_type",
        "event_date",
        "message",
        "status",
        "created_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.name.clone())
            .bind(self.email.clone())
            .bind(self.phone.clone())
            .bind(self.event_type.clone())
            .bind(self.event_date)
            .bind(self.message.clone())
            .bind(self.status)
            .bind(self.created_at)
    }
}

impl Record for EventType {
    const TABLE: &'static str = "event_types";
    const COLUMNS: &'static [&'static str] = &["id", "name", "slug", "description", "created_at"];
    const UNIQUE: &'static [&'static str] = &["slug"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.name.clone())
            .bind(self.slug.clone())
            .bind(self.description.clone())
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "slug" => Some(Key::Text(&self.slug)),
            _ => None,
        }
    }
}

impl Record for Package {
    const TABLE: &'static str = "packages";
    const COLUMNS: &'static [&'static str] =
        &["id", "event_type_id", "name", "description", "price", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.event_type_id)
            .bind(self.name.clone())
            .bind(self.description.clone())
            .bind(self.price)
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "event_type_id" => self.event_type_id.map(Key::Id),
            _ => None,
        }
    }
}

impl Record for Booking {
    const TABLE: &'static str = "bookings";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "client_id",
        "package_id",
        "inquiry_id",
        "title",
        "event_date",
        "location",
        "package_price",
        "deposit_amount",
        "status",
        "lifecycle_stage",
        "notes",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.client_id)
            .bind(self.package_id)
            .bind(self.inquiry_id)
            .bind(self.title.clone())
            .bind(self.event_date)
            .bind(self.location.clone())
            .bind(self.package_price)
            .bind(self.deposit_amount)
            .bind(self.status.clone())
            .bind(self.lifecycle_stage.clone())
            .bind(self.notes.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "client_id" => self.client_id.map(Key::Id),
            "package_id" => self.package_id.map(Key::Id),
            "inquiry_id" => self.inquiry_id.map(Key::Id),
            _ => None,
        }
    }
}

impl Record for Payment {
    const TABLE: &'static str = "payments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "booking_id",
        "amount",
        "status",
        "method",
        "provider_reference",
        "paid_at",
        "created_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.booking_id)
            .bind(self.amount)
            .bind(self.status.clone())
            .bind(self.method.clone())
            .bind(self.provider_reference.clone())
            .bind(self.paid_at)
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "booking_id" => Some(Key::Id(self.booking_id)),
            _ => None,
        }
    }
}

impl Record for Gallery {
    const TABLE: &'static str = "galleries";
    const COLUMNS: &'static [&'static str] =
        &["id", "booking_id", "title", "status", "cover_photo_url", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.booking_id)
            .bind(self.title.clone())
            .bind(self.status)
            .bind(self.cover_photo_url.clone())
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "booking_id" => self.booking_id.map(Key::Id),
            _ => None,
        }
    }
}

impl Record for Photo {
    const TABLE: &'static str = "photos";
    const COLUMNS: &'static [&'static str] =
        &["id", "gallery_id", "storage_key", "caption", "sort_order", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.gallery_id)
            .bind(self.storage_key.clone())
            .bind(self.caption.clone())
            .bind(self.sort_order)
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "gallery_id" => Some(Key::Id(self.gallery_id)),
            _ => None,
        }
    }
}

impl Record for PortfolioItem {
    const TABLE: &'static str = "portfolio_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "category",
        "image_url",
        "description",
        "featured",
        "sort_order",
        "created_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.title.clone())
            .bind(self.category.clone())
            .bind(self.image_url.clone())
            .bind(self.description.clone())
            .bind(self.featured)
            .bind(self.sort_order)
            .bind(self.created_at)
    }
}

impl Record for Testimonial {
    const TABLE: &'static str = "testimonials";
    const COLUMNS: &'static [&'static str] =
        &["id", "client_name", "quote", "rating", "approved", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.client_name.clone())
            .bind(self.quote.clone())
            .bind(self.rating)
            .bind(self.approved)
            .bind(self.created_at)
    }
}

impl Record for BlogPost {
    const TABLE: &'static str = "blog_posts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "slug",
        "excerpt",
        "body",
        "published",
        "published_at",
        "created_at",
    ];
    const UNIQUE: &'static [&'static str] = &["slug"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.title.clone())
            .bind(self.slug.clone())
            .bind(self.excerpt.clone())
            .bind(self.body.clone())
            .bind(self.published)
            .bind(self.published_at)
            .bind(self.created_at)
    }

    fn key(&self, column: &str) -> Option<Key<'_>> {
        match column {
            "slug" => Some(Key::Text(&self.slug)),
            _ => None,
        }
    }
}

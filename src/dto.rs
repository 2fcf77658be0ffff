use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::Record,
    error::ApiError,
    lifecycle::LifecycleStage,
    models::{
        BlogPost, Booking, EventType, Gallery, GalleryStatus, Inquiry, InquiryStatus, Package,
        Payment, PaymentStatus, Photo, PortfolioItem, Testimonial, User, UserRole,
    },
};

/// A foreign key that must point at an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    User(Uuid),
    Inquiry(Uuid),
    EventType(Uuid),
    Package(Uuid),
    Booking(Uuid),
}

/// A record the admin API can create and patch generically.
pub trait Resource: Record {
    const NAME: &'static str;
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;

    fn build(input: Self::Create, now: DateTime<Utc>) -> Result<Self, ApiError>;
    fn apply(&mut self, input: Self::Update, now: DateTime<Utc>) -> Result<(), ApiError>;

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

// Largest amount a NUMERIC(12, 2) column holds.
pub const MAX_MONEY: f64 = 9_999_999_999.99;

pub fn money(field: &'static str, value: f64) -> Result<Decimal, ApiError> {
    if !value.is_finite() || value.abs() > MAX_MONEY {
        return Err(ApiError::invalid_field(field, "range"));
    }
    Decimal::from_f64(value)
        .map(|amount| amount.round_dp(2))
        .ok_or_else(|| ApiError::invalid_field(field, "range"))
}

fn check_slug(slug: &str) -> Result<(), ApiError> {
    let valid = !slug.is_empty()
        && slug.len() <= 120
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::invalid_field("slug", "slug"))
    }
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn required(field: &'static str, value: String) -> Result<String, ApiError> {
    let value = trimmed(value);
    if value.is_empty() {
        return Err(ApiError::invalid_field(field, "blank"));
    }
    Ok(value)
}

// Clearing optional text is done by sending an empty string.
fn optional_text(value: Option<String>) -> Option<String> {
    value.map(trimmed).filter(|text| !text.is_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

impl Resource for User {
    const NAME: &'static str = "user";
    type Create = NewUser;
    type Update = UserPatch;

    fn build(input: NewUser, now: DateTime<Utc>) -> Result<Self, ApiError> {
        Ok(User {
            id: Uuid::new_v4(),
            email: input.email.trim().to_ascii_lowercase(),
            full_name: required("full_name", input.full_name)?,
            phone: optional_text(input.phone),
            role: input.role.unwrap_or(UserRole::Client),
            created_at: now,
        })
    }

    fn apply(&mut self, input: UserPatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(email) = input.email {
            self.email = email.trim().to_ascii_lowercase();
        }
        if let Some(full_name) = input.full_name {
            self.full_name = required("full_name", full_name)?;
        }
        if input.phone.is_some() {
            self.phone = optional_text(input.phone);
        }
        if let Some(role) = input.role {
            self.role = role;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInquiry {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InquiryPatch {
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub status: Option<InquiryStatus>,
}

impl Resource for Inquiry {
    const NAME: &'static str = "inquiry";
    type Create = NewInquiry;
    type Update = InquiryPatch;

    fn build(input: NewInquiry, now: DateTime<Utc>) -> Result<Self, ApiError> {
        Ok(Inquiry {
            id: Uuid::new_v4(),
            name: required("name", input.name)?,
            email: input.email.trim().to_ascii_lowercase(),
            phone: optional_text(input.phone),
            event_type: optional_text(input.event_type),
            event_date: input.event_date,
            message: required("message", input.message)?,
            status: InquiryStatus::New,
            created_at: now,
        })
    }

    fn apply(&mut self, input: InquiryPatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if input.phone.is_some() {
            self.phone = optional_text(input.phone);
        }
        if input.event_type.is_some() {
            self.event_type = optional_text(input.event_type);
        }
        if input.event_date.is_some() {
            self.event_date = input.event_date;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEventType {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub slug: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventTypePatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl Resource for EventType {
    const NAME: &'static str = "event type";
    type Create = NewEventType;
    type Update = EventTypePatch;

    fn build(input: NewEventType, now: DateTime<Utc>) -> Result<Self, ApiError> {
        check_slug(&input.slug)?;
        Ok(EventType {
            id: Uuid::new_v4(),
            name: required("name", input.name)?,
            slug: input.slug,
            description: optional_text(input.description),
            created_at: now,
        })
    }

    fn apply(&mut self, input: EventTypePatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(slug) = input.slug {
            check_slug(&slug)?;
            self.slug = slug;
        }
        if let Some(name) = input.name {
            self.name = required("name", name)?;
        }
        if input.description.is_some() {
            self.description = optional_text(input.description);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    pub event_type_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub price: f64,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PackagePatch {
    pub event_type_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub price: Option<f64>,
}

impl Resource for Package {
    const NAME: &'static str = "package";
    type Create = NewPackage;
    type Update = PackagePatch;

    fn build(input: NewPackage, now: DateTime<Utc>) -> Result<Self, ApiError> {
        Ok(Package {
            id: Uuid::new_v4(),
            event_type_id: input.event_type_id,
            name: required("name", input.name)?,
            description: optional_text(input.description),
            price: money("price", input.price)?,
            created_at: now,
        })
    }

    fn apply(&mut self, input: PackagePatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if input.event_type_id.is_some() {
            self.event_type_id = input.event_type_id;
        }
        if let Some(name) = input.name {
            self.name = required("name", name)?;
        }
        if input.description.is_some() {
            self.description = optional_text(input.description);
        }
        if let Some(price) = input.price {
            self.price = money("price", price)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.event_type_id.map(Reference::EventType).into_iter().collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub client_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub inquiry_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub event_date: Option<NaiveDate>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub package_price: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub deposit_amount: f64,
    pub status: Option<LifecycleStage>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub client_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub package_price: Option<f64>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub deposit_amount: Option<f64>,
    /// `null` clears the stored value so the stage is inferred again.
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<LifecycleStage>>,
    #[serde(default, deserialize_with = "nullable")]
    pub lifecycle_stage: Option<Option<LifecycleStage>>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

// Tells an explicit `null` (Some(None)) apart from an absent field (None).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_deposit(booking: &Booking) -> Result<(), ApiError> {
    if booking.deposit_amount > booking.package_price {
        return Err(ApiError::invalid_field("deposit_amount", "exceeds_package_price"));
    }
    Ok(())
}

impl Resource for Booking {
    const NAME: &'static str = "booking";
    type Create = NewBooking;
    type Update = BookingPatch;

    fn build(input: NewBooking, now: DateTime<Utc>) -> Result<Self, ApiError> {
        let booking = Booking {
            id: Uuid::new_v4(),
            client_id: input.client_id,
            package_id: input.package_id,
            inquiry_id: input.inquiry_id,
            title: required("title", input.title)?,
            event_date: input.event_date,
            location: optional_text(input.location),
            package_price: money("package_price", input.package_price)?,
            deposit_amount: money("deposit_amount", input.deposit_amount)?,
            status: input.status.map(|stage| stage.as_str().to_string()),
            lifecycle_stage: None,
            notes: optional_text(input.notes),
            created_at: now,
            updated_at: now,
        };
        check_deposit(&booking)?;
        Ok(booking)
    }

    fn apply(&mut self, input: BookingPatch, now: DateTime<Utc>) -> Result<(), ApiError> {
        if input.client_id.is_some() {
            self.client_id = input.client_id;
        }
        if input.package_id.is_some() {
            self.package_id = input.package_id;
        }
        if let Some(title) = input.title {
            self.title = required("title", title)?;
        }
        if input.event_date.is_some() {
            self.event_date = input.event_date;
        }
        if input.location.is_some() {
            self.location = optional_text(input.location);
        }
        if let Some(price) = input.package_price {
            self.package_price = money("package_price", price)?;
        }
        if let Some(deposit) = input.deposit_amount {
            self.deposit_amount = money("deposit_amount", deposit)?;
        }
        if let Some(status) = input.status {
            self.status = status.map(|stage| stage.as_str().to_string());
        }
        if let Some(stage) = input.lifecycle_stage {
            self.lifecycle_stage = stage.map(|stage| stage.as_str().to_string());
        }
        if input.notes.is_some() {
            self.notes = optional_text(input.notes);
        }
        check_deposit(self)?;
        self.updated_at = now;
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        refs.extend(self.client_id.map(Reference::User));
        refs.extend(self.package_id.map(Reference::Package));
        refs.extend(self.inquiry_id.map(Reference::Inquiry));
        refs
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub booking_id: Uuid,
    #[validate(range(min = 0.01, max = 9999999999.99))]
    pub amount: f64,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 50))]
    pub method: Option<String>,
    #[validate(length(max = 200))]
    pub provider_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPatch {
    #[validate(range(min = 0.01, max = 9999999999.99))]
    pub amount: Option<f64>,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 50))]
    pub method: Option<String>,
    #[validate(length(max = 200))]
    pub provider_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Resource for Payment {
    const NAME: &'static str = "payment";
    type Create = NewPayment;
    type Update = PaymentPatch;

    fn build(input: NewPayment, now: DateTime<Utc>) -> Result<Self, ApiError> {
        let status = input.status.unwrap_or(PaymentStatus::Pending);
        let paid_at = match (input.paid_at, status.counts_toward_paid()) {
            (Some(at), _) => Some(at),
            (None, true) => Some(now),
            (None, false) => None,
        };
        Ok(Payment {
            id: Uuid::new_v4(),
            booking_id: input.booking_id,
            amount: money("amount", input.amount)?,
            status: status.as_str().to_string(),
            method: optional_text(input.method),
            provider_reference: optional_text(input.provider_reference),
            paid_at,
            created_at: now,
        })
    }

    fn apply(&mut self, input: PaymentPatch, now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(amount) = input.amount {
            self.amount = money("amount", amount)?;
        }
        if let Some(status) = input.status {
            self.status = status.as_str().to_string();
        }
        if input.method.is_some() {
            self.method = optional_text(input.method);
        }
        if input.provider_reference.is_some() {
            self.provider_reference = optional_text(input.provider_reference);
        }
        if input.paid_at.is_some() {
            self.paid_at = input.paid_at;
        } else if self.counts_toward_paid() && self.paid_at.is_none() {
            self.paid_at = Some(now);
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::Booking(self.booking_id)]
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewGallery {
    pub booking_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub status: Option<GalleryStatus>,
    #[validate(url)]
    pub cover_photo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPatch {
    pub booking_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub status: Option<GalleryStatus>,
    #[validate(url)]
    pub cover_photo_url: Option<String>,
}

impl Resource for Gallery {
    const NAME: &'static str = "gallery";
    type Create = NewGallery;
    type Update = GalleryPatch;

    fn build(input: NewGallery, now: DateTime<Utc>) -> Result<Self, ApiError> {
        Ok(Gallery {
            id: Uuid::new_v4(),
            booking_id: input.booking_id,
            title: required("title", input.title)?,
            status: input.status.unwrap_or(GalleryStatus::Draft),
            cover_photo_url: optional_text(input.cover_photo_url),
            created_at: now,
        })
    }

    fn apply(&mut self, input: GalleryPatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if input.booking_id.is_some() {
            self.booking_id = input.booking_id;
        }
        if let Some(title) = input.title {
            self.title = required("title", title)?;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        if input.cover_photo_url.is_some() {
            self.cover_photo_url = optional_text(input.cover_photo_url);
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.booking_id.map(Reference::Booking).into_iter().collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    #[validate(length(min = 1, max = 500))]
    pub storage_key: String,
    #[validate(length(max = 500))]
    pub caption: Option<String>,
    pub sort_order: Option<i32>,
}

impl NewPhoto {
    /// Keys must stay relative to the photo base url.
    pub fn into_photo(self, gallery_id: Uuid, now: DateTime<Utc>) -> Result<Photo, ApiError> {
        let storage_key = self.storage_key.trim().trim_start_matches('/').to_string();
        let escapes = storage_key.is_empty()
            || storage_key.contains("://")
            || storage_key.contains('\\')
            || storage_key.split('/').any(|segment| segment == "..");
        if escapes {
            return Err(ApiError::invalid_field("storage_key", "relative_path"));
        }
        Ok(Photo {
            id: Uuid::new_v4(),
            gallery_id,
            storage_key,
            caption: optional_text(self.caption),
            sort_order: self.sort_order.unwrap_or(0),
            created_at: now,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolioItem {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(url)]
    pub image_url: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItemPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub featured: Option<bool>,
    pub sort_order: Option<i32>,
}

impl Resource for PortfolioItem {
    const NAME: &'static str = "portfolio item";
    type Create = NewPortfolioItem;
    type Update = PortfolioItemPatch;

    fn build(input: NewPortfolioItem, now: DateTime<Utc>) -> Result<Self, ApiError> {
        Ok(PortfolioItem {
            id: Uuid::new_v4(),
            title: required("title", input.title)?,
            category: optional_text(input.category),
            image_url: input.image_url,
            description: optional_text(input.description),
            featured: input.featured,
            sort_order: input.sort_order,
            created_at: now,
        })
    }

    fn apply(&mut self, input: PortfolioItemPatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(title) = input.title {
            self.title = required("title", title)?;
        }
        if input.category.is_some() {
            self.category = optional_text(input.category);
        }
        if let Some(image_url) = input.image_url {
            self.image_url = image_url;
        }
        if input.description.is_some() {
            self.description = optional_text(input.description);
        }
        if let Some(featured) = input.featured {
            self.featured = featured;
        }
        if let Some(sort_order) = input.sort_order {
            self.sort_order = sort_order;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    #[validate(length(min = 1, max = 2000))]
    pub quote: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub approved: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialPatch {
    #[validate(length(min = 1, max = 200))]
    pub client_name: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub quote: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    pub approved: Option<bool>,
}

impl Resource for Testimonial {
    const NAME: &'static str = "testimonial";
    type Create = NewTestimonial;
    type Update = TestimonialPatch;

    fn build(input: NewTestimonial, now: DateTime<Utc>) -> Result<Self, ApiError> {
        Ok(Testimonial {
            id: Uuid::new_v4(),
            client_name: required("client_name", input.client_name)?,
            quote: required("quote", input.quote)?,
            rating: input.rating,
            approved: input.approved.unwrap_or(false),
            created_at: now,
        })
    }

    fn apply(&mut self, input: TestimonialPatch, _now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(client_name) = input.client_name {
            self.client_name = required("client_name", client_name)?;
        }
        if let Some(quote) = input.quote {
            self.quote = required("quote", quote)?;
        }
        if let Some(rating) = input.rating {
            self.rating = rating;
        }
        if let Some(approved) = input.approved {
            self.approved = approved;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBlogPost {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub slug: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1))]
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1))]
    pub body: Option<String>,
    pub published: Option<bool>,
}

impl Resource for BlogPost {
    const NAME: &'static str = "blog post";
    type Create = NewBlogPost;
    type Update = BlogPostPatch;

    fn build(input: NewBlogPost, now: DateTime<Utc>) -> Result<Self, ApiError> {
        check_slug(&input.slug)?;
        Ok(BlogPost {
            id: Uuid::new_v4(),
            title: required("title", input.title)?,
            slug: input.slug,
            excerpt: optional_text(input.excerpt),
            body: required("body", input.body)?,
            published: input.published,
            published_at: input.published.then_some(now),
            created_at: now,
        })
    }

    fn apply(&mut self, input: BlogPostPatch, now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(slug) = input.slug {
            check_slug(&slug)?;
            self.slug = slug;
        }
        if let Some(title) = input.title {
            self.title = required("title", title)?;
        }
        if input.excerpt.is_some() {
            self.excerpt = optional_text(input.excerpt);
        }
        if let Some(body) = input.body {
            self.body = required("body", body)?;
        }
        match input.published {
            Some(true) => {
                self.published = true;
                self.published_at.get_or_insert(now);
            }
            Some(false) => {
                self.published = false;
                self.published_at = None;
            }
            None => {}
        }
        Ok(())
    }
}

/// Body of `POST /admin/inquiries/:id/convert`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConvertInquiry {
    pub client_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub package_price: Option<f64>,
    #[validate(range(min = 0.0, max = 9999999999.99))]
    pub deposit_amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse<T: DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rejects_empty_title_and_negative_amounts() {
        let input: NewBooking = parse(json!({
            "title": "",
            "packagePrice": -5,
            "depositAmount": -1,
        }));
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn deposit_may_not_exceed_package_price() {
        let input: NewBooking = parse(json!({
            "title": "Wedding",
            "packagePrice": 1000,
            "depositAmount": 1500,
        }));
        input.validate().unwrap();
        let err = Booking::build(input, Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn new_booking_keeps_status_unset_unless_given() {
        let input: NewBooking = parse(json!({ "title": "Portraits", "packagePrice": 400 }));
        let booking = Booking::build(input, Utc::now()).unwrap();
        assert_eq!(booking.status, None);
        assert_eq!(booking.deposit_amount, Decimal::ZERO);

        let input: NewBooking = parse(json!({
            "title": "Portraits",
            "packagePrice": 400,
            "status": "upcoming",
        }));
        let booking = Booking::build(input, Utc::now()).unwrap();
        assert_eq!(booking.status.as_deref(), Some("upcoming"));
    }

    #[test]
    fn legacy_status_is_not_accepted_on_write() {
        let result = serde_json::from_value::<BookingPatch>(json!({ "status": "confirmed" }));
        assert!(result.is_err());
    }

    #[test]
    fn booking_patch_updates_and_rechecks_deposit() {
        let input: NewBooking = parse(json!({
            "title": "Gala",
            "packagePrice": 2000,
            "depositAmount": 500,
        }));
        let mut booking = Booking::build(input, Utc::now()).unwrap();

        let patch: BookingPatch = parse(json!({ "packagePrice": 300 }));
        assert!(booking.apply(patch, Utc::now()).is_err());

        booking.package_price = Decimal::from(2000);
        let patch: BookingPatch = parse(json!({ "location": "  Harbour Hall ", "notes": "" }));
        booking.apply(patch, Utc::now()).unwrap();
        assert_eq!(booking.location.as_deref(), Some("Harbour Hall"));
        assert_eq!(booking.notes, None);
    }

    #[test]
    fn rejects_malformed_email_and_rating() {
        let inquiry: NewInquiry = parse(json!({
            "name": "Ana",
            "email": "not-an-email",
            "message": "Hello",
        }));
        assert!(inquiry.validate().is_err());

        for rating in [0, 6] {
            let testimonial: NewTestimonial = parse(json!({
                "clientName": "Ana",
                "quote": "Lovely",
                "rating": rating,
            }));
            assert!(testimonial.validate().is_err(), "rating {rating}");
        }
    }

    #[test]
    fn slugs_are_lowercase_words() {
        assert!(check_slug("spring-weddings-2026").is_ok());
        for slug in ["", "Spring", "spring weddings", "-spring", "spring-", "ünïcode"] {
            assert!(check_slug(slug).is_err(), "{slug:?}");
        }
    }

    #[test]
    fn succeeded_payments_get_paid_at() {
        let now = Utc::now();
        let input: NewPayment = parse(json!({
            "bookingId": Uuid::new_v4(),
            "amount": 250.5,
            "status": "succeeded",
        }));
        let payment = Payment::build(input, now).unwrap();
        assert_eq!(payment.paid_at, Some(now));
        assert_eq!(payment.amount, Decimal::new(25050, 2));

        let input: NewPayment = parse(json!({ "bookingId": Uuid::new_v4(), "amount": 10 }));
        let mut payment = Payment::build(input, now).unwrap();
        assert_eq!(payment.status, "pending");
        assert_eq!(payment.paid_at, None);

        let patch: PaymentPatch = parse(json!({ "status": "succeeded" }));
        payment.apply(patch, now).unwrap();
        assert_eq!(payment.paid_at, Some(now));
    }

    #[test]
    fn publishing_sets_and_clears_published_at() {
        let now = Utc::now();
        let input: NewBlogPost = parse(json!({
            "title": "Light",
            "slug": "light",
            "body": "Golden hour.",
        }));
        let mut post = BlogPost::build(input, now).unwrap();
        assert!(post.published_at.is_none());

        post.apply(parse(json!({ "published": true })), now).unwrap();
        assert_eq!(post.published_at, Some(now));

        post.apply(parse(json!({ "published": false })), now).unwrap();
        assert!(!post.published);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn amounts_beyond_the_money_column_are_rejected() {
        for amount in [1e11, 1e30] {
            let input: NewBooking = parse(json!({ "title": "Wedding", "packagePrice": amount }));
            assert!(input.validate().is_err(), "{amount}");
            let err = Booking::build(input, Utc::now()).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));

            let input: NewPayment = parse(json!({
                "bookingId": Uuid::new_v4(),
                "amount": amount,
                "status": "succeeded",
            }));
            assert!(input.validate().is_err(), "{amount}");
            assert!(Payment::build(input, Utc::now()).is_err());
        }
        assert_eq!(money("amount", MAX_MONEY).unwrap(), Decimal::new(999_999_999_999, 2));
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        let input: NewBooking = parse(json!({ "title": "   ", "packagePrice": 100 }));
        let err = Booking::build(input, Utc::now()).unwrap_err();
        let ApiError::Validation(errors) = err else { panic!("expected validation error") };
        assert!(errors.field_errors().contains_key("title"));

        let input: NewBlogPost = parse(json!({ "title": "Light", "slug": "light", "body": " \n " }));
        assert!(BlogPost::build(input, Utc::now()).is_err());

        let input: NewBooking = parse(json!({ "title": "Gala", "packagePrice": 100 }));
        let mut booking = Booking::build(input, Utc::now()).unwrap();
        assert!(booking.apply(parse(json!({ "title": "  " })), Utc::now()).is_err());
    }

    #[test]
    fn photo_keys_stay_under_the_base_url() {
        let now = Utc::now();
        for key in ["https://other.host/x.jpg", "../x.jpg", "a/../../b.jpg", "a\\b.jpg", "/"] {
            let input: NewPhoto = parse(json!({ "storageKey": key }));
            assert!(input.into_photo(Uuid::new_v4(), now).is_err(), "{key:?}");
        }
        let input: NewPhoto = parse(json!({ "storageKey": "/weddings/a..b.jpg" }));
        let photo = input.into_photo(Uuid::new_v4(), now).unwrap();
        assert_eq!(photo.storage_key, "weddings/a..b.jpg");
    }

    #[test]
    fn null_status_clears_it_and_absent_status_keeps_it() {
        let input: NewBooking = parse(json!({
            "title": "Gala",
            "packagePrice": 100,
            "status": "cancelled",
        }));
        let mut booking = Booking::build(input, Utc::now()).unwrap();
        booking.lifecycle_stage = Some("pending_delivery".to_string());

        booking.apply(parse(json!({ "notes": "rebooked" })), Utc::now()).unwrap();
        assert_eq!(booking.status.as_deref(), Some("cancelled"));

        booking
            .apply(parse(json!({ "status": null, "lifecycleStage": null })), Utc::now())
            .unwrap();
        assert_eq!(booking.status, None);
        assert_eq!(booking.lifecycle_stage, None);
    }
}

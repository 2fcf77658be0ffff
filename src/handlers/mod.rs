use std::{sync::Arc, time::Instant};

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use url::Url;

use crate::{
    db::Store,
    models::{BlogPost, EventType, Gallery, Inquiry, Package, Payment, PortfolioItem, Testimonial, User},
};

pub mod bookings;
pub mod crud;
pub mod dashboard;
pub mod galleries;
pub mod portal;
pub mod public;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub photo_base_url: Arc<Url>,
}

impl AppState {
    pub fn new(store: Store, photo_base_url: Url) -> Self {
        AppState {
            store,
            photo_base_url: Arc::new(photo_base_url),
        }
    }

    pub fn photo_url(&self, storage_key: &str) -> String {
        match self.photo_base_url.join(storage_key.trim_start_matches('/')) {
            Ok(url) => url.to_string(),
            Err(err) => {
                warn!("cannot build url for photo key {:?}: {}", storage_key, err);
                storage_key.to_string()
            }
        }
    }
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    let elapsed = started.elapsed().as_millis();
    if status.is_server_error() {
        error!("{} {} -> {} ({} ms)", method, path, status, elapsed);
    } else {
        info!("{} {} -> {} ({} ms)", method, path, status, elapsed);
    }
    response
}

fn admin_routes() -> Router<AppState> {
    let galleries = Router::new()
        .route("/", get(crud::list::<Gallery>).post(crud::create::<Gallery>))
        .route(
            "/:id",
            get(crud::show::<Gallery>)
                .put(crud::update::<Gallery>)
                .patch(crud::update::<Gallery>)
                .delete(galleries::remove_gallery),
        )
        .route("/:id/photos", get(galleries::list_photos).post(galleries::add_photo));

    let bookings = Router::new()
        .route("/", get(bookings::list).post(bookings::create))
        .route(
            "/:id",
            get(bookings::show)
                .put(bookings::update)
                .patch(bookings::update)
                .delete(bookings::cancel),
        );

    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .nest("/bookings", bookings)
        .nest("/galleries", galleries)
        .route("/photos/:id", delete(galleries::remove_photo))
        .nest(
            "/inquiries",
            crud::routes::<Inquiry>().route("/:id/convert", post(bookings::convert_inquiry)),
        )
        .nest("/users", crud::routes::<User>())
        .nest("/event-types", crud::routes::<EventType>())
        .nest("/packages", crud::routes::<Package>())
        .nest("/payments", crud::routes::<Payment>())
        .nest("/portfolio", crud::routes::<PortfolioItem>())
        .nest("/testimonials", crud::routes::<Testimonial>())
        .nest("/blog", crud::routes::<BlogPost>())
}

fn portal_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(portal::me))
        .route("/bookings", get(portal::my_bookings))
        .route("/bookings/:id", get(portal::my_booking))
        .route("/galleries", get(portal::my_galleries))
        .route("/galleries/:id/photos", get(portal::my_gallery_photos))
        .route("/payments", get(portal::my_payments))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(public::health))
        .route("/portfolio", get(public::list_portfolio))
        .route("/portfolio/:id", get(public::show_portfolio_item))
        .route(
            "/testimonials",
            get(public::list_testimonials).post(public::submit_testimonial),
        )
        .route("/blog", get(public::list_posts))
        .route("/blog/:slug", get(public::show_post))
        .route("/event-types", get(public::list_event_types))
        .route("/packages", get(public::list_packages))
        .route("/inquiries", post(public::submit_inquiry))
        .nest("/me", portal_routes())
        .nest("/admin", admin_routes())
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

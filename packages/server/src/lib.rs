#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the city pulse incident pipeline.
//!
//! Serves the synchronizer's latest published snapshot (incidents,
//! analytics, status), a `GeoJSON` marker layer kept in step with it by a
//! [`MapPresenter`], and the write-back endpoints used by report forms.

mod handlers;

use std::sync::{Arc, Mutex, PoisonError};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use city_pulse_map::geojson_layer::GeoJsonLayer;
use city_pulse_map::presenter::MapPresenter;
use city_pulse_source::backend::Backend;
use city_pulse_source::config::DATABASE_URL_ENV;
use city_pulse_source::store::EventStore;
use city_pulse_sync::{FeedSnapshot, FeedSynchronizer, SyncHandle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared application state.
pub struct AppState {
    /// The running synchronizer.
    pub sync: Arc<SyncHandle>,
    /// Write-back client, absent when no backend is configured.
    pub store: Option<Arc<dyn EventStore>>,
    /// Name of the feed client, for the status endpoint.
    pub backend_name: Option<String>,
    /// Marker layer mirroring the published collection.
    pub markers: Arc<Mutex<GeoJsonLayer>>,
}

impl AppState {
    /// Starts the synchronizer and the marker reconciler for `backend`.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(backend: Option<Backend>) -> Self {
        let sync = Arc::new(
            FeedSynchronizer::new(backend.as_ref().map(|b| Arc::clone(&b.feed))).start(),
        );
        let markers = Arc::new(Mutex::new(GeoJsonLayer::new()));
        spawn_map_reconciler(sync.subscribe(), Arc::clone(&markers));

        Self {
            sync,
            backend_name: backend.as_ref().map(|b| b.name().to_string()),
            store: backend.map(|b| b.store),
            markers,
        }
    }
}

/// Rebuilds the marker layer on every published snapshot until the
/// synchronizer goes away.
fn spawn_map_reconciler(
    mut updates: watch::Receiver<Arc<FeedSnapshot>>,
    layer: Arc<Mutex<GeoJsonLayer>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut presenter = MapPresenter::new();
        loop {
            let snapshot = Arc::clone(&updates.borrow_and_update());
            {
                let mut layer = layer.lock().unwrap_or_else(PoisonError::into_inner);
                presenter.reconcile(&mut *layer, &snapshot.incidents);
            }
            if updates.changed().await.is_err() {
                log::debug!("Synchronizer stopped, marker reconciler exiting");
                break;
            }
        }
    })
}

/// Opens the backend configured in the environment, logging why there is
/// none when it cannot be opened.
#[must_use]
pub fn backend_from_env() -> Option<Backend> {
    match Backend::from_env() {
        Ok(Some(backend)) => {
            log::info!("Using {} event feed", backend.name());
            Some(backend)
        }
        Ok(None) => {
            log::warn!("{DATABASE_URL_ENV} is not set, serving demo data");
            None
        }
        Err(e) => {
            log::error!("Failed to open event feed: {e}");
            None
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/incidents", web::get().to(handlers::incidents))
            .route("/incidents", web::post().to(handlers::create_incident))
            .route("/incidents/{id}", web::patch().to(handlers::update_incident))
            .route("/incidents/{id}", web::delete().to(handlers::delete_incident))
            .route("/analytics", web::get().to(handlers::analytics))
            .route("/stats", web::get().to(handlers::stats))
            .route("/status", web::get().to(handlers::status))
            .route("/markers", web::get().to(handlers::markers)),
    );
}

/// Starts the city pulse API server.
///
/// Starts the synchronizer for `backend` and serves the API until the
/// server stops. This is a regular async function; the caller is
/// responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(backend: Option<Backend>) -> std::io::Result<()> {
    let state = web::Data::new(AppState::start(backend));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    let app_state = state.clone();
    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await;

    state.sync.shutdown();
    result
}

//! HTTP handler functions for the city pulse API.

use std::sync::PoisonError;

use actix_web::{HttpResponse, web};
use chrono::Utc;
use city_pulse_analytics::dashboard::{
    IncidentFilter, dashboard_stats, filter_incidents, sort_incidents_by,
};
use city_pulse_geography::Gazetteer;
use city_pulse_server_models::{
    ApiCreated, ApiError, ApiHealth, ApiIncident, ApiIncidentList, ApiStatus, IncidentQueryParams,
};
use city_pulse_source::StoreError;
use city_pulse_source::store::{EventStore, IncidentDraft, IncidentUpdate};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/incidents`
///
/// Returns the published incidents, optionally searched, filtered to the
/// city, by severity and by category, and reordered.
pub async fn incidents(
    state: web::Data<AppState>,
    params: web::Query<IncidentQueryParams>,
) -> HttpResponse {
    let snapshot = state.sync.current();

    let filter = IncidentFilter {
        query: params.q.as_deref(),
        severity: params.severity,
        category: params.category.as_deref(),
        within: params
            .in_city
            .unwrap_or(false)
            .then(|| Gazetteer::bengaluru().bounds()),
    };
    let mut matching = filter_incidents(&snapshot.incidents, &filter);
    if let Some(sort) = params.sort {
        sort_incidents_by(&mut matching, sort);
    }

    let incidents: Vec<ApiIncident> = matching
        .into_iter()
        .take(params.limit.unwrap_or(usize::MAX))
        .map(ApiIncident::from)
        .collect();

    HttpResponse::Ok().json(ApiIncidentList {
        incidents,
        using_fallback: snapshot.using_fallback,
    })
}

/// `GET /api/analytics`
pub async fn analytics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.sync.current().analytics)
}

/// `GET /api/stats`
///
/// Severity counts, the last hour's count and the category list for the
/// incidents inside the city.
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.sync.current();
    HttpResponse::Ok().json(dashboard_stats(
        &snapshot.incidents,
        Gazetteer::bengaluru().bounds(),
        Utc::now(),
    ))
}

/// `GET /api/status`
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.sync.current();

    HttpResponse::Ok().json(ApiStatus {
        state: snapshot.state.to_string(),
        indicator: snapshot.indicator().to_string(),
        using_fallback: snapshot.using_fallback,
        loading: snapshot.loading,
        error: snapshot.error.clone(),
        incident_count: snapshot.incidents.len(),
        backend: state.backend_name.clone(),
        updated_at: snapshot.updated_at,
    })
}

/// `GET /api/markers`
///
/// Returns the marker layer as a `GeoJSON` `FeatureCollection`.
pub async fn markers(state: web::Data<AppState>) -> HttpResponse {
    let collection = state
        .markers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .to_feature_collection();

    HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(collection)
}

/// `POST /api/incidents`
pub async fn create_incident(
    state: web::Data<AppState>,
    draft: web::Json<IncidentDraft>,
) -> HttpResponse {
    let Some(store) = store(&state) else {
        return no_backend();
    };

    let event = match draft.into_inner().into_event(Utc::now()) {
        Ok(event) => event,
        Err(e) => return store_error("create incident", &e),
    };

    match store.create(event).await {
        Ok(id) => HttpResponse::Created().json(ApiCreated { id }),
        Err(e) => store_error("create incident", &e),
    }
}

/// `PATCH /api/incidents/{id}`
pub async fn update_incident(
    state: web::Data<AppState>,
    path: web::Path<String>,
    update: web::Json<IncidentUpdate>,
) -> HttpResponse {
    let Some(store) = store(&state) else {
        return no_backend();
    };

    let update = update.into_inner();
    if update.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new("update changes nothing"));
    }

    match store.update(&path, update.into_patch()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => store_error("update incident", &e),
    }
}

/// `DELETE /api/incidents/{id}`
pub async fn delete_incident(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let Some(store) = store(&state) else {
        return no_backend();
    };

    match store.delete(&path).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => store_error("delete incident", &e),
    }
}

fn store(state: &AppState) -> Option<&dyn EventStore> {
    state.store.as_deref()
}

fn no_backend() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ApiError::new("event feed not configured"))
}

fn store_error(action: &str, e: &StoreError) -> HttpResponse {
    match e {
        StoreError::InvalidDraft { .. } | StoreError::InvalidKey { .. } => {
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
        StoreError::NotFound { .. } => HttpResponse::NotFound().json(ApiError::new(e.to_string())),
        StoreError::Closed => {
            HttpResponse::ServiceUnavailable().json(ApiError::new(e.to_string()))
        }
        StoreError::Http(_) | StoreError::Json(_) | StoreError::Status { .. } => {
            log::error!("Failed to {action}: {e}");
            HttpResponse::BadGateway().json(ApiError::new(format!("Failed to {action}")))
        }
    }
}

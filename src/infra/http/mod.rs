mod middleware;
mod public;

pub use public::{HttpState, build_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;
use crate::application::error::HttpError;
use crate::compose::ResolveError;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a composite resolution failure to a consistent HTTP error response.
pub fn resolve_error_to_http(source: &'static str, err: ResolveError) -> HttpError {
    match err {
        ResolveError::InvalidIdentifier(inner) => HttpError::from_error(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid composite identifier",
            &inner,
        ),
        ResolveError::AssetNotFound { .. } => HttpError::from_error(
            source,
            StatusCode::NOT_FOUND,
            "Composite not found",
            &err,
        ),
        err => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render composite",
            &err,
        ),
    }
}

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stratus_core::{CoreError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// `axum::Json` with rejections rendered in the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Dependency => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, code, message) = match self {
            AppError::Core(err) => {
                if err.kind() == ErrorKind::Dependency {
                    tracing::error!("Dependency failure: {}", err);
                }
                let kind = err.kind();
                (status_for(kind), json!(kind), err.code(), err.to_string())
            }
            AppError::AuthenticationError(msg) => (
                StatusCode::UNAUTHORIZED,
                json!("AUTHENTICATION"),
                "INVALID_TOKEN",
                msg,
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!(ErrorKind::Validation),
                "MALFORMED_REQUEST",
                msg,
            ),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("INTERNAL"),
                    "INTERNAL_ERROR",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "kind": kind,
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        let cases = [
            (CoreError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::CabinMismatch {
                seat_number: "1A".into(),
                seat_class: stratus_core::flight::CabinClass::First,
                cabin: stratus_core::flight::CabinClass::Economy,
            }, StatusCode::BAD_REQUEST),
            (CoreError::SeatNotFound("99Z".into()), StatusCode::NOT_FOUND),
            (CoreError::SeatTaken("12C".into()), StatusCode::CONFLICT),
            (CoreError::CheckInNotYetOpen(24), StatusCode::CONFLICT),
            (CoreError::AuthorizationError("x".into()), StatusCode::FORBIDDEN),
            (CoreError::DependencyFailure("db".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_authentication_is_401() {
        let response = AppError::AuthenticationError("bad token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

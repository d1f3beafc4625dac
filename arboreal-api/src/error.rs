use arboreal_core::pms::PmsError;
use arboreal_order::BookingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

/// Where the guest is sent when a stage is reached without its prerequisites.
pub const AVAILABILITY_ENTRY: &str = "/availability";

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    /// 303 See Other to a fixed location.
    Redirect(&'static str),
    /// The PMS answered but refused the request. The upstream is healthy.
    UpstreamRejected {
        message: String,
        code: Option<String>,
    },
    UpstreamError {
        message: String,
        code: Option<String>,
    },
    ServiceUnavailable(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Redirect(location) => return Redirect::to(location).into_response(),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::UpstreamRejected { message, code } => {
                tracing::info!("PMS rejected request: {} ({:?})", message, code);
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message, "code": code }))
            }
            AppError::UpstreamError { message, code } => {
                tracing::warn!("PMS failure surfaced to guest: {} ({:?})", message, code);
                (StatusCode::BAD_GATEWAY, json!({ "error": message, "code": code }))
            }
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": msg }))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(id) => AppError::NotFoundError(format!("Booking {} not found", id)),
            BookingError::InvalidTransition { .. } => AppError::ConflictError(err.to_string()),
            BookingError::MissingPrerequisite(_) => AppError::Redirect(AVAILABILITY_ENTRY),
            BookingError::NotConfirmed => AppError::Redirect("/"),
            BookingError::Validation(msg) => AppError::ValidationError(msg),
            BookingError::Conflict(msg) => AppError::ConflictError(msg),
            BookingError::Pms(e) => e.into(),
            BookingError::Store(e) => AppError::Anyhow(e.into()),
            BookingError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<PmsError> for AppError {
    fn from(err: PmsError) -> Self {
        match err {
            PmsError::Rejected { message, code } => AppError::UpstreamRejected { message, code },
            PmsError::Transport(detail) => {
                tracing::error!("PMS transport error: {}", detail);
                AppError::UpstreamError {
                    message: "The booking service is unreachable. Please try again.".to_string(),
                    code: None,
                }
            }
            PmsError::InvalidResponse(detail) => {
                tracing::error!("Unexpected PMS response: {}", detail);
                AppError::UpstreamError {
                    message: "Booking failed. Please try again.".to_string(),
                    code: None,
                }
            }
            PmsError::InvalidConfig(detail) => AppError::InternalServerError(detail),
        }
    }
}

impl From<arboreal_core::CoreError> for AppError {
    fn from(err: arboreal_core::CoreError) -> Self {
        match err {
            arboreal_core::CoreError::ValidationError(msg) => AppError::ValidationError(msg),
            arboreal_core::CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (AppError::ConflictError("x".into()), StatusCode::CONFLICT),
            (AppError::Redirect("/"), StatusCode::SEE_OTHER),
            (
                AppError::UpstreamError { message: "x".into(), code: None },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::UpstreamRejected { message: "x".into(), code: None },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_navigation_errors_redirect() {
        let err: AppError = BookingError::MissingPrerequisite("guest details").into();
        assert!(matches!(err, AppError::Redirect(AVAILABILITY_ENTRY)));

        let err: AppError = BookingError::NotConfirmed.into();
        let response = err.into_response();
        assert_eq!(response.headers()["location"], "/");
    }

    #[test]
    fn test_pms_rejection_is_not_a_gateway_failure() {
        let rejected: AppError = PmsError::Rejected {
            message: "Room not available".into(),
            code: Some("RNA".into()),
        }
        .into();
        assert_eq!(rejected.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unreachable: AppError = PmsError::Transport("connection refused".into()).into();
        assert_eq!(unreachable.into_response().status(), StatusCode::BAD_GATEWAY);

        let garbled: AppError = PmsError::InvalidResponse("not json".into()).into();
        assert_eq!(garbled.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}

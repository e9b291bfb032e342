use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::service::ServiceError;

/// Error answered to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    /// A clipboard operation failed
    Service(ServiceError),
    /// The request could not be decoded
    Rejected { status: StatusCode, message: String },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(e) => status_for(e),
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

/// HTTP status for each service error kind
pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Validation(_)
        | ServiceError::InvalidItem(_)
        | ServiceError::IndexOutOfRange { .. }
        | ServiceError::PasscodeNotApplicable => StatusCode::BAD_REQUEST,
        ServiceError::PasscodeRequired | ServiceError::InvalidPasscode => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) | ServiceError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Storage(_) | ServiceError::Passcode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

/// Oversized bodies keep their 413, any other decoding problem is a 400
fn rejection_status(status: StatusCode) -> StatusCode {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        status
    } else {
        StatusCode::BAD_REQUEST
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::rejected(rejection_status(rejection.status()), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::rejected(rejection_status(rejection.status()), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Service(e) => e.to_string(),
            ApiError::Rejected { message, .. } => message,
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case::validation(ServiceError::Validation("Code is required".into()), StatusCode::BAD_REQUEST)]
    #[case::invalid_item(ServiceError::InvalidItem("x".into()), StatusCode::BAD_REQUEST)]
    #[case::range(ServiceError::IndexOutOfRange { index: 5, len: 1 }, StatusCode::BAD_REQUEST)]
    #[case::not_applicable(ServiceError::PasscodeNotApplicable, StatusCode::BAD_REQUEST)]
    #[case::required(ServiceError::PasscodeRequired, StatusCode::FORBIDDEN)]
    #[case::invalid(ServiceError::InvalidPasscode, StatusCode::FORBIDDEN)]
    #[case::not_found(ServiceError::NotFound("demo".into()), StatusCode::NOT_FOUND)]
    #[case::item_not_found(ServiceError::ItemNotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case::storage(
        ServiceError::Storage(StoreError::Backend("boom".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    fn test_status_mapping(#[case] error: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(status_for(&error), expected);
        assert_eq!(ApiError::from(error).into_response().status(), expected);
    }

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let error = ServiceError::Storage(StoreError::Backend("/var/db/secret.db locked".into()));
        assert_eq!(error.to_string(), "Internal Server Error");
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            rejection_status(StatusCode::UNPROCESSABLE_ENTITY),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            rejection_status(StatusCode::UNSUPPORTED_MEDIA_TYPE),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            rejection_status(StatusCode::PAYLOAD_TOO_LARGE),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}

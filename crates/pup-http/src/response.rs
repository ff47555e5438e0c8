//! JSON responders and the error-to-status mapping

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use pup_core::{AuthError, Error};
use serde::Serialize;

/// Body sent when a response cannot be serialized
pub const SECRET_FAILURE_BODY: &str = r#"{"error":"something awful happened, but it's a secret™"}"#;

/// Challenge sent with 401 responses
pub const AUTH_CHALLENGE: &str = "token";

#[derive(Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Serialize `data` as pretty JSON with `status`.
///
/// A serialization failure is logged and replaced by a generic 500 so the
/// underlying error never reaches the client.
pub fn json_respond<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> Response {
    match serde_json::to_vec_pretty(data) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(err = %e, "failed to marshal data to json");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                SECRET_FAILURE_BODY,
            )
                .into_response()
        }
    }
}

/// An error on its way to the wire: status plus a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    challenge: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            challenge: false,
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            challenge: true,
            ..Self::new(StatusCode::UNAUTHORIZED, Error::Unauthorized.to_string())
        }
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, Error::Forbidden.to_string())
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Error::BadRequest(detail.into()).to_string(),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map a pipeline failure. State-machine rejections are 500 unless
    /// `conflict_status` asks for 409. Backend failures get a fixed message;
    /// their detail only goes to the log.
    pub fn from_core(context: &str, err: &Error, conflict_status: bool) -> Self {
        let status = match err {
            Error::Unauthorized => return Self::unauthorized(),
            Error::Forbidden => return Self::forbidden(),
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) | Error::Timeout(_) | Error::Internal(_) => {
                tracing::error!(kind = err.kind(), "{}: {}", context, err);
                let summary = match err {
                    Error::Storage(_) => "storage unavailable",
                    Error::Timeout(_) => "storage timed out",
                    _ => "internal error",
                };
                return Self::internal(format!("{context}: {summary}"));
            }
            e if e.is_conflict() && conflict_status => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, format!("{context}: {err}"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => Self::unauthorized(),
            AuthError::Forbidden => Self::forbidden(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = json_respond(
            self.status,
            &ErrorBody {
                error: &self.message,
            },
        );
        if self.challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_CHALLENGE),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("database password is hunter2"))
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serialization_failure_is_secret() {
        let response = json_respond(StatusCode::OK, &Unserializable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert_eq!(body, SECRET_FAILURE_BODY);
        assert!(!body.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_unauthorized_carries_challenge() {
        let response = ApiError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "token");
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, serde_json::json!({"error": "unauthorized"}));
    }

    #[test]
    fn test_conflict_mapping() {
        let err = Error::InvalidState {
            current: "awake".into(),
        };
        let default = ApiError::from_core("failed to update device state", &err, false);
        assert_eq!(default.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            default.message(),
            r#"failed to update device state: invalid or unknown state "awake""#
        );

        let conflict = ApiError::from_core("failed to update device state", &err, true);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let storage = ApiError::from_core("failed", &Error::storage("down"), true);
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_backend_detail_stays_off_the_wire() {
        let err = Error::storage("Redis error: auth failed for redis://:hunter2@cache");
        let api = ApiError::from_core("failed to update device state", &err, false);
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message(), "failed to update device state: storage unavailable");

        let err = Error::timeout("get on redis store exceeded 5s");
        let api = ApiError::from_core("failed to fetch devices", &err, false);
        assert_eq!(api.message(), "failed to fetch devices: storage timed out");
    }
}

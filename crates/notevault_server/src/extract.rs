//! Request extractors that report rejections as `ApiError` bodies.
//!
//! # Invariants
//! - Every body or query rejection is `422 VALIDATION_ERROR` with a JSON body.

use crate::routes::ApiError;
use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use log::warn;
use serde::de::DeserializeOwned;

/// JSON request body.
pub(crate) struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                warn!(
                    "event=http_request module=server status=rejected error_code=invalid_body status_code={}",
                    rejection.status().as_u16()
                );
                Err(ApiError::validation(rejection.body_text()))
            }
        }
    }
}

/// URL query string.
pub(crate) struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                warn!("event=http_request module=server status=rejected error_code=invalid_query");
                Err(ApiError::validation(rejection.body_text()))
            }
        }
    }
}

/// Parses a boolean query flag: `true|1|yes|on` and `false|0|no|off`,
/// case-insensitive.
pub(crate) fn parse_flag(name: &str, raw: &str) -> Result<bool, (StatusCode, Json<ApiError>)> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ApiError::validation(format!(
            "query parameter `{name}` must be a boolean, got `{raw}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_flag;
    use axum::http::StatusCode;

    #[test]
    fn flags_accept_common_spellings() {
        for raw in ["true", "1", "YES", " on "] {
            assert!(parse_flag("previous", raw).unwrap(), "{raw}");
        }
        for raw in ["false", "0", "No", "off"] {
            assert!(!parse_flag("previous", raw).unwrap(), "{raw}");
        }
    }

    #[test]
    fn unknown_flag_values_are_unprocessable() {
        let (status, body) = parse_flag("previous", "maybe").unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.0.error.contains("previous"));
    }
}

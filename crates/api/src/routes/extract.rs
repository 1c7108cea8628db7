//! Request body extractors.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON is rejected with `{"detail": ...}` and failed rules with
/// the per-field error map, both as 400.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value.validate()?;
        Ok(Self(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::Rejected("Se esperaba un cuerpo JSON.".to_string())
        }
        other => AppError::Rejected(format!("JSON inválido: {}", other.body_text())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{StatusCode, header},
        routing::post,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Sample {
        #[validate(required, length(min = 3))]
        nombre: Option<String>,
    }

    async fn call(body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route(
            "/",
            post(|ValidJson(sample): ValidJson<Sample>| async move {
                sample.nombre.unwrap_or_default()
            }),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_missing_field_is_required() {
        let (status, json) = call("{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["nombre"][0], "Este campo es requerido.");
    }

    #[tokio::test]
    async fn test_rule_failure_is_reported_per_field() {
        let (status, json) = call(r#"{"nombre": "ab"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["nombre"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_json_is_detail() {
        let (status, json) = call("{nombre").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap().starts_with("JSON inválido"));
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, _) = call(r#"{"nombre": "Honda"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }
}

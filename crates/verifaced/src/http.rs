//! HTTP surface: liveness check and the verification endpoint.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::{EngineError, EngineHandle};
use veriface_core::image::ImageError;
use veriface_core::{decode_image, Verdict};

/// Request body cap: two images at 10 MiB each plus multipart overhead.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    engine: EngineHandle,
}

/// Build the application router.
pub fn router(engine: EngineHandle) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/verify", post(verify_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

/// GET / — liveness check.
async fn home_handler() -> Json<serde_json::Value> {
    Json(json!({"message": "AI service running"}))
}

/// POST /verify — multipart form with `document` and `selfie` image files.
async fn verify_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Verdict>, ApiError> {
    let mut document: Option<Vec<u8>> = None;
    let mut selfie: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document" | "selfie" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read {name}: {e}")))?;
                if name == "document" {
                    document = Some(bytes.to_vec());
                } else {
                    selfie = Some(bytes.to_vec());
                }
            }
            // Unknown fields are ignored.
            _ => {}
        }
    }

    let (Some(document), Some(selfie)) = (document, selfie) else {
        return Err(ApiError::MissingFiles);
    };

    let document = decode_image(&document)?;
    let selfie = decode_image(&selfie)?;

    let verdict = state.engine.verify(document, selfie).await?;

    tracing::info!(
        status = ?verdict.status,
        risk_score = verdict.risk_score,
        face_verified = verdict.face_verified,
        "verification complete"
    );

    Ok(Json(verdict))
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("document and selfie required")]
    MissingFiles,
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),
    #[error("{0}")]
    BadRequest(String),
    #[error("verification unavailable: {0}")]
    Engine(#[from] EngineError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFiles | ApiError::InvalidImage(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (self.status_code(), Json(json!({"error": self.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tower::ServiceExt;
    use veriface_core::types::FaceMatch;
    use veriface_core::verdict;

    const BOUNDARY: &str = "test-boundary";

    fn test_router() -> Router {
        let verdict = verdict::assess(
            "PASSPORT DOE JOHN",
            &FaceMatch { verified: true, distance: 0.2 },
        );
        router(EngineHandle::stub(verdict))
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in fields {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.png\"\r\n\
                     Content-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn verify_request(fields: &[(&str, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/verify")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields)))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_home_liveness() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, json!({"message": "AI service running"}));
    }

    #[tokio::test]
    async fn test_verify_missing_both_fields() {
        let response = test_router()
            .oneshot(verify_request(&[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json, json!({"error": "document and selfie required"}));
    }

    #[tokio::test]
    async fn test_verify_missing_selfie() {
        let png = png_bytes();
        let response = test_router()
            .oneshot(verify_request(&[("document", &png)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        // Exactly one key, the fixed message.
        assert_eq!(json, json!({"error": "document and selfie required"}));
    }

    #[tokio::test]
    async fn test_verify_missing_document() {
        let png = png_bytes();
        let response = test_router()
            .oneshot(verify_request(&[("selfie", &png)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json, json!({"error": "document and selfie required"}));
    }

    #[tokio::test]
    async fn test_verify_undecodable_image() {
        let png = png_bytes();
        let garbage = vec![0u8; 32];
        let response = test_router()
            .oneshot(verify_request(&[("document", &garbage), ("selfie", &png)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        let msg = json["error"].as_str().unwrap();
        assert!(msg.starts_with("invalid image:"), "{msg}");
    }

    #[tokio::test]
    async fn test_verify_success_shape() {
        let png = png_bytes();
        let response = test_router()
            .oneshot(verify_request(&[("document", &png), ("selfie", &png)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "Verified");
        assert_eq!(json["risk_score"], 0);
        assert_eq!(json["face_verified"], true);
        assert_eq!(json["ocr_text"], "PASSPORT DOE JOHN");
        assert!(json["face_distance"].is_number());
    }

    #[tokio::test]
    async fn test_verify_ignores_unknown_fields() {
        let png = png_bytes();
        let response = test_router()
            .oneshot(verify_request(&[
                ("extra", b"whatever"),
                ("document", &png),
                ("selfie", &png),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

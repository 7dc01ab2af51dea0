//! Image uploads against a local axum upload route.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use million_listings::api::{ApiClient, CORRELATION_ID_HEADER};
use million_listings::config::Config;
use million_listings::upload::{ImageSlot, ImageUploader, UploadError};

#[derive(Debug, Default, Clone)]
struct Received {
    pathname: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    size: usize,
    correlation_id: Option<String>,
    authorization: Option<String>,
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn uploader(app_url: &str) -> ImageUploader {
    let config = Config {
        app_url: app_url.to_string(),
        blob_token: Some("blob-secret".to_string()),
        ..Config::default()
    };
    let client = ApiClient::with_base_url(&format!("{}/api", app_url), Duration::from_secs(5)).unwrap();
    ImageUploader::new(&client, &config).unwrap()
}

async fn accept_upload(
    State(seen): State<Arc<Mutex<Received>>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut received = Received {
        correlation_id: headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..Default::default()
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("pathname") => received.pathname = Some(field.text().await.unwrap()),
            Some("file") => {
                received.file_name = field.file_name().map(str::to_string);
                received.content_type = field.content_type().map(str::to_string);
                received.size = field.bytes().await.unwrap().len();
            }
            _ => {}
        }
    }

    let pathname = received.pathname.clone().unwrap_or_default();
    *seen.lock().unwrap() = received;
    Json(json!({
        "url": format!("https://blob.million.test/{}", pathname),
        "pathname": pathname,
        "contentType": "image/webp"
    }))
}

#[tokio::test]
async fn gallery_image_is_posted_as_multipart() {
    let seen = Arc::new(Mutex::new(Received::default()));
    let app = Router::new()
        .route("/api/upload", post(accept_upload))
        .with_state(seen.clone());
    let base = serve(app).await;

    let uploaded = uploader(&base)
        .upload("42", ImageSlot::Gallery(3), "image/webp", vec![7u8; 2048])
        .await
        .unwrap();
    assert_eq!(uploaded.url, "https://blob.million.test/properties/42/3.webp");
    assert_eq!(uploaded.pathname, "properties/42/3.webp");

    let received = seen.lock().unwrap().clone();
    assert_eq!(received.pathname.as_deref(), Some("properties/42/3.webp"));
    assert_eq!(received.file_name.as_deref(), Some("3.webp"));
    assert_eq!(received.content_type.as_deref(), Some("image/webp"));
    assert_eq!(received.size, 2048);
    assert_eq!(received.authorization.as_deref(), Some("Bearer blob-secret"));
    let correlation_id = received.correlation_id.unwrap();
    assert!(uuid::Uuid::parse_str(&correlation_id).is_ok());
}

#[tokio::test]
async fn rejected_upload_surfaces_problem_details() {
    let app = Router::new().route(
        "/api/upload",
        post(|| async {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                [(header::CONTENT_TYPE, "application/problem+json")],
                json!({
                    "title": "Payload Too Large",
                    "status": 413,
                    "detail": "Blob store quota exceeded"
                })
                .to_string(),
            )
        }),
    );
    let base = serve(app).await;

    let err = uploader(&base)
        .upload("42", ImageSlot::Cover, "image/png", vec![1u8; 16])
        .await
        .unwrap_err();
    match err {
        UploadError::Api(api) => {
            assert_eq!(api.status(), 413);
            assert_eq!(api.message(), "Blob store quota exceeded");
            assert!(api.correlation_id().is_some());
        }
        other => panic!("expected a backend rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn invalid_slot_never_reaches_the_route() {
    // No server: a request would fail as a network error instead
    let err = uploader("http://127.0.0.1:9")
        .upload("42", ImageSlot::Gallery(13), "image/png", vec![1u8; 16])
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::IndexOutOfRange { index: 13, max: 12 }));
}

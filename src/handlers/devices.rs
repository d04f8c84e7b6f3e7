use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{error::AppResult, models::Device, AppState};

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_devices(State(state): State<AppState>) -> AppResult<Json<Vec<Device>>> {
    let devices = state.devices.list().await?;

    info!(count = devices.len(), "Listed devices");

    Ok(Json(devices))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Device>> {
    let device = state.devices.get(id).await?;

    info!(id, "Fetched device");

    Ok(Json(device))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_device(
    State(state): State<AppState>,
    Json(payload): Json<Device>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let id = payload.id;
    state.devices.create(payload).await?;

    info!(id, "Created device");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Device created",
            "id": id,
        })),
    ))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Device>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    state.devices.update(id, payload).await?;

    info!(id, "Updated device");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Device updated",
            "id": id,
        })),
    ))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    state.devices.delete(id).await?;

    info!(id, "Deleted device");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Device deleted",
            "id": id,
        })),
    ))
}

// ── Transfer ──────────────────────────────────────────────────────────────────

pub async fn transfer_device(
    State(state): State<AppState>,
    Path((id, warehouse)): Path<(i64, String)>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    state.devices.transfer(id, &warehouse).await?;

    info!(id, warehouse = %warehouse, "Transferred device");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Device transferred",
            "id": id,
            "warehouse": warehouse,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, response::Response};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::{service::DeviceService, store::DeviceStore};

    fn app(dir: &TempDir) -> axum::Router {
        let store = DeviceStore::new(dir.path().join("devices.xml"));
        crate::build_router(AppState {
            devices: Arc::new(DeviceService::new(store)),
        })
    }

    fn fridge() -> Value {
        json!({
            "id": 1,
            "name": "Fridge",
            "brand": "X",
            "price": 999.99,
            "category": "kitchen",
            "warehouse": "A",
        })
    }

    async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = TempDir::new().unwrap();
        let response = send(&app(&dir), "GET", "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn list_on_empty_store_returns_empty_array() {
        let dir = TempDir::new().unwrap();
        let response = send(&app(&dir), "GET", "/devices", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn create_then_list_and_get() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let response = send(&app, "POST", "/devices", Some(fridge())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["id"], 1);

        let response = send(&app, "GET", "/devices", None).await;
        assert_eq!(json_body(response).await, json!([fridge()]));

        let response = send(&app, "GET", "/devices/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, fridge());
    }

    #[tokio::test]
    async fn create_duplicate_returns_400() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/devices", Some(fridge())).await;

        let response = send(&app, "POST", "/devices", Some(fridge())).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Device with id 1 already exists"
        );
    }

    #[tokio::test]
    async fn get_missing_returns_404() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/devices", Some(fridge())).await;

        let response = send(&app, "GET", "/devices/999", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Device 999 not found");
    }

    #[tokio::test]
    async fn update_replaces_device() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/devices", Some(fridge())).await;
        let mut replacement = fridge();
        replacement["price"] = json!(799.0);
        replacement["name"] = json!("Fridge Mk2");

        let response = send(&app, "PUT", "/devices/1", Some(replacement.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/devices/1", None).await;
        assert_eq!(json_body(response).await, replacement);
    }

    #[tokio::test]
    async fn update_missing_returns_404() {
        let dir = TempDir::new().unwrap();
        let response = send(&app(&dir), "PUT", "/devices/1", Some(fridge())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_get_returns_404() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/devices", Some(fridge())).await;

        let response = send(&app, "DELETE", "/devices/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/devices/1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, "DELETE", "/devices/1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn transfer_moves_device() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/devices", Some(fridge())).await;

        let response = send(&app, "PUT", "/devices/1/transfer/B", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["warehouse"], "B");

        let mut expected = fridge();
        expected["warehouse"] = json!("B");
        let response = send(&app, "GET", "/devices/1", None).await;
        assert_eq!(json_body(response).await, expected);
    }

    #[tokio::test]
    async fn transfer_keeps_padded_warehouse_name() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/devices", Some(fridge())).await;

        let response = send(&app, "PUT", "/devices/1/transfer/%20Dock%203%20", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/devices/1", None).await;
        assert_eq!(json_body(response).await["warehouse"], " Dock 3 ");
    }

    #[tokio::test]
    async fn transfer_missing_returns_404() {
        let dir = TempDir::new().unwrap();
        let response = send(&app(&dir), "PUT", "/devices/5/transfer/B", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn corrupt_store_returns_generic_500() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("devices.xml"), "<inventory><device><id>x").unwrap();

        let response = send(&app(&dir), "GET", "/devices", None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Internal server error");
    }
}

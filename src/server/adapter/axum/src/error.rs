/* src/server/adapter/axum/src/error.rs */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use storefront_router::RouterError;

/// `RouterError` rendered as an HTTP error envelope.
#[derive(Debug)]
pub struct AxumError(pub RouterError);

impl From<RouterError> for AxumError {
  fn from(err: RouterError) -> Self {
    Self(err)
  }
}

impl IntoResponse for AxumError {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
      "ok": false,
      "error": { "code": self.0.code(), "message": self.0.to_string() },
    });
    (status, axum::Json(body)).into_response()
  }
}

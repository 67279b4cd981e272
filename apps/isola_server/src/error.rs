//! The failure taxonomy of the HTTP surface. Handlers return `ApiError`;
//! one `IntoResponse` impl maps it to a status plus a short Italian
//! message the GM console shows verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use isoladb::StoreError;
use isolaproto::command::CommandError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The console-facing message. Internal details never leak: the
    /// response carries a generic line, the detail goes to the log.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m) => m,
            ApiError::Internal(_) => "errore interno",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            warn!(err = %detail, "request failed with internal error");
        }
        let body = serde_json::json!({ "error": self.message() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PlayerNotFound(n) => {
                ApiError::NotFound(format!("giocatore non trovato: {n}"))
            }
            StoreError::ItemNotFound(id) => ApiError::NotFound(format!("oggetto non trovato: {id}")),
            StoreError::StorageNotFound(l) => {
                ApiError::NotFound(format!("deposito non trovato: {l}"))
            }
            StoreError::NoSpace => ApiError::Conflict("inventario pieno".to_string()),
            StoreError::OutOfBounds => {
                ApiError::BadRequest("posizione fuori dalla griglia".to_string())
            }
            StoreError::Overlap => ApiError::Conflict("posizione occupata".to_string()),
            StoreError::Persist(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_the_taxonomy() {
        let e = ApiError::from(StoreError::PlayerNotFound("bob".to_string()));
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
        assert_eq!(e.message(), "giocatore non trovato: bob");

        assert_eq!(
            ApiError::from(StoreError::NoSpace).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StoreError::OutOfBounds).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::Overlap).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn internal_detail_stays_out_of_the_message() {
        let e = ApiError::from(StoreError::Persist("disk on fire".to_string()));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message(), "errore interno");
    }

    #[test]
    fn command_errors_are_bad_requests() {
        let e = ApiError::from(CommandError::UnknownVerb("_boom".to_string()));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message(), "comando sconosciuto: _boom");
    }
}

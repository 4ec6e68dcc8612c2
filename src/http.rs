//! # HTTP Transport
//!
//! Thin axum layer over the reconciliation engine: one `/identify` route
//! accepting a JSON observation and returning the canonical cluster view,
//! plus a `/health` liveness route. Syntactic validation and normalization
//! happen here, before the core is invoked; no linking logic lives in this
//! module.

use crate::error::{EngineError, StoreError};
use crate::model::{ClusterView, Observation};
use crate::Unilink;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inbound request body for `/identify`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Success envelope for `/identify`.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyResponse {
    pub contact: ClusterView,
}

/// Error body shared by every non-2xx response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Build the service router.
pub fn router(service: Arc<Unilink>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/identify", post(identify))
        .with_state(service)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

async fn identify(
    State(service): State<Arc<Unilink>>,
    Json(request): Json<IdentifyRequest>,
) -> Result<Json<IdentifyResponse>, (StatusCode, Json<ErrorBody>)> {
    let observation = validate(&request).map_err(bad_request)?;
    match service.identify(&observation) {
        Ok(contact) => Ok(Json(IdentifyResponse { contact })),
        Err(err) => {
            tracing::error!(error = %err, %observation, "identify failed");
            Err(engine_error_response(err))
        }
    }
}

/// Normalize and syntactically check an inbound request.
///
/// Values are trimmed and emails case-folded before the core ever sees
/// them; empty strings count as absent.
fn validate(request: &IdentifyRequest) -> Result<Observation, String> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase);
    let phone = request
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    if email.is_none() && phone.is_none() {
        return Err("Either email or phoneNumber is required".to_string());
    }
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err("Invalid email format".to_string());
        }
    }
    if let Some(phone) = &phone {
        if !is_valid_phone(phone) {
            return Err("Invalid phone number format".to_string());
        }
    }

    Ok(Observation {
        email,
        phone,
    })
}

/// local@domain with no whitespace and a dot inside the domain.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Optional leading `+`, then at least ten digit/space/dash/paren characters.
fn is_valid_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    rest.len() >= 10
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

fn bad_request(message: String) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: "Bad Request".to_string(),
            message,
        }),
    )
}

fn engine_error_response(err: EngineError) -> (StatusCode, Json<ErrorBody>) {
    match err {
        EngineError::InvalidObservation => bad_request(err.to_string()),
        EngineError::RetriesExhausted { .. }
        | EngineError::Store(StoreError::Unavailable(_))
        | EngineError::Store(StoreError::Conflict(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "Service Unavailable".to_string(),
                message: err.to_string(),
            }),
        ),
        EngineError::ClusterNotFound(_) | EngineError::Store(StoreError::NotFound(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: "Internal Server Error".to_string(),
                message: err.to_string(),
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, phone: Option<&str>) -> IdentifyRequest {
        IdentifyRequest {
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("ada.lovelace@mail.example.co.uk"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example."));
        assert!(!is_valid_email("ada"));
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("5551230100"));
        assert!(is_valid_phone("+1 (555) 123-0100"));
        assert!(!is_valid_phone("555-0100"));
        assert!(!is_valid_phone("call-me-maybe"));
    }

    #[test]
    fn validation_requires_a_contact_point() {
        assert!(validate(&request(None, None)).is_err());
        assert!(validate(&request(Some("   "), Some(""))).is_err());
    }

    #[test]
    fn validation_normalizes_values() {
        let observation =
            validate(&request(Some("  Ada@Example.COM "), Some(" 5551230100 "))).expect("valid");
        assert_eq!(observation.email.as_deref(), Some("ada@example.com"));
        assert_eq!(observation.phone.as_deref(), Some("5551230100"));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        assert!(validate(&request(Some("not-an-email"), None)).is_err());
        assert!(validate(&request(None, Some("123"))).is_err());
        // A bad field is rejected even when the other one is fine.
        assert!(validate(&request(Some("ada@example.com"), Some("123"))).is_err());
    }
}

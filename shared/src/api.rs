use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::urn::BadUrn;

/// Build the standard response envelope: JSON body plus the CORS headers the
/// frontend expects on every response, success or failure.
pub fn json_response(
    status: StatusCode,
    body: serde_json::Value,
) -> Result<Response<Body>, Error> {
    let resp = Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Credentials", "true")
        .body(body.to_string().into())
        .map_err(Box::new)?;
    Ok(resp)
}

/// Deserialize a request body, reporting a malformed one as a validation
/// failure rather than a handler error.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Failed to parse body: {}", e);
        ApiError::validation(&format!("Invalid request body: {}", e), vec![])
    })
}

/// Business failures handlers can hit. Each renders to a structured JSON
/// response; nothing here ever aborts the invocation.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input. Lists the offending fields.
    Validation {
        message: String,
        fields: Vec<&'static str>,
    },
    /// A referenced entity does not exist. Echoes the identifier.
    NotFound { message: String, id: String },
    /// The request is valid but contradicts current state.
    Conflict { message: String, state: String },
    /// Store or provider call failed for reasons unrelated to the input.
    Upstream { message: String },
    /// Corrupt stored reference.
    CorruptReference(BadUrn),
}

impl ApiError {
    pub fn validation(message: &str, fields: Vec<&'static str>) -> ApiError {
        ApiError::Validation {
            message: message.to_string(),
            fields,
        }
    }

    pub fn not_found(message: &str, id: &str) -> ApiError {
        ApiError::NotFound {
            message: message.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: &str, state: &str) -> ApiError {
        ApiError::Conflict {
            message: message.to_string(),
            state: state.to_string(),
        }
    }

    pub fn upstream(message: &str) -> ApiError {
        ApiError::Upstream {
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::CorruptReference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, fields } => serde_json::json!({
                "message": message,
                "requiredFields": fields,
            }),
            ApiError::NotFound { message, id } => serde_json::json!({
                "message": message,
                "id": id,
            }),
            ApiError::Conflict { message, state } => serde_json::json!({
                "message": message,
                "state": state,
            }),
            ApiError::Upstream { message } => serde_json::json!({
                "message": message,
            }),
            ApiError::CorruptReference(bad) => {
                tracing::error!("Corrupt owner reference: {}", bad);
                serde_json::json!({
                    "message": "A stored entity reference is invalid",
                })
            }
        };
        json_response(status, body)
    }
}

impl From<BadUrn> for ApiError {
    fn from(bad: BadUrn) -> Self {
        ApiError::CorruptReference(bad)
    }
}

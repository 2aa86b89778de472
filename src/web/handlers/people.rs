// POST /get-people: people and their associated places for a document URL.
//
// Request:  a JSON object with a string `URL` field; any other fields are
//           echoed back untouched.
// Response: the request object plus `people`.
//
// 400 for an unusable body, a missing/non-string URL, or a document that
// can't be fetched as text. 500 when the NER backend fails.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};

use crate::pipeline::PipelineError;
use crate::web::{api_error, AppState};

const URL_FIELD: &str = "URL";
const PEOPLE_FIELD: &str = "people";

/// POST /get-people: run the pipeline for the document at `URL`.
pub async fn get_people(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let Json(mut body) = match payload {
        Ok(body) => body,
        Err(rejection) => return api_error(rejection.status(), &rejection.body_text()),
    };

    let url = match body.get(URL_FIELD) {
        Some(Value::String(url)) => url.clone(),
        Some(_) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "The provided value under the field \"URL\" was not a string",
            )
        }
        None => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "Bad request: \"URL\" field not provided in the json request",
            )
        }
    };

    match state.pipeline.run(&url).await {
        Ok(people) => match serde_json::to_value(&people) {
            Ok(people) => {
                body.insert(PEOPLE_FIELD.to_string(), people);
                Json(Value::Object(body)).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize people");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize result")
            }
        },
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(url = %url, error = %e, "Pipeline failed");
            } else {
                tracing::warn!(url = %url, error = %e, "Rejected document");
            }
            api_error(status, &public_message(&e))
        }
    }
}

/// Map a pipeline failure to the status the caller sees.
pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Fetch(_) => StatusCode::BAD_REQUEST,
        PipelineError::Extraction(_) | PipelineError::Aggregate(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Fetch errors describe the caller's own URL, so they are returned as-is.
/// Backend errors may carry upstream response bodies and stay in the logs.
fn public_message(error: &PipelineError) -> String {
    match error {
        PipelineError::Fetch(e) => e.to_string(),
        PipelineError::Extraction(_) => {
            "The API used for computing is not functioning. Please try again later".to_string()
        }
        PipelineError::Aggregate(_) => {
            "The API used for computing returned malformed results".to_string()
        }
    }
}

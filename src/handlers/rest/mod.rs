use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use serde::Serialize;
use serde_json::Value;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{NotePayload, NoteResponse},
    service::{NoteService, NoteServiceError},
};

#[derive(OpenApi)]
#[openapi(
    paths(create_note, get_one_note, get_all_notes, update_note, delete_note),
    components(schemas(NoteResponse, NotePayload)),
    tags(
        (name = "notes", description = "Notes management API")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/note",
    request_body = NotePayload,
    responses(
        (status = 201, description = "Note created successfully", body = NoteResponse),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(State(service): State<Arc<NoteService>>, body: Bytes) -> Response {
    let payload = match decode_payload(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    match service.create_note(payload).await {
        Ok(note) => json_response(StatusCode::CREATED, &note),
        Err(e) => error_response("create note", &e),
    }
}

#[utoipa::path(
    get,
    path = "/note/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", body = NoteResponse),
        (status = 404, description = "Note not found, or the id is not an integer"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_one_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    match service.get_one_note(&id).await {
        Ok(note) => json_response(StatusCode::OK, &note),
        Err(e) => error_response("get note", &e),
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "List of all notes", body = Vec<NoteResponse>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_all_notes(State(service): State<Arc<NoteService>>) -> Response {
    match service.get_all_notes().await {
        Ok(notes) => json_response(StatusCode::OK, &notes),
        Err(e) => error_response("get all notes", &e),
    }
}

#[utoipa::path(
    patch,
    path = "/note/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = NotePayload,
    responses(
        (status = 200, description = "Note updated; empty body"),
        (status = 400, description = "Malformed request body"),
        (status = 404, description = "Note not found (only with the not_found missing-row policy)"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let payload = match decode_payload(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    match service.update_note(&id, payload).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => error_response("update note", &e),
    }
}

#[utoipa::path(
    delete,
    path = "/note/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note deleted; empty body"),
        (status = 404, description = "Note not found (only with the not_found missing-row policy)"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(State(service): State<Arc<NoteService>>, Path(id): Path<String>) -> Response {
    match service.delete_note(&id).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => error_response("delete note", &e),
    }
}

// Reads the first JSON value of the body; anything after it is ignored.
// Only an object (or `null`, which leaves every field empty) is a payload.
#[allow(clippy::result_large_err)]
fn decode_payload(body: &[u8]) -> Result<NotePayload, Response> {
    let decoded = serde_json::Deserializer::from_slice(body)
        .into_iter::<Value>()
        .next();

    let result = match decoded {
        Some(Ok(Value::Null)) => Ok(NotePayload::default()),
        Some(Ok(value @ Value::Object(_))) => {
            serde_json::from_value::<NotePayload>(value).map_err(|e| e.to_string())
        }
        Some(Ok(other)) => Err(format!("invalid type: {}, expected a note object", json_kind(&other))),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("EOF while parsing request body".to_string()),
    };

    result.map_err(|message| {
        tracing::warn!("failed to decode request body: {}", message);
        (StatusCode::BAD_REQUEST, message).into_response()
    })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!("failed to encode response: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

fn error_response(action: &str, err: &NoteServiceError) -> Response {
    match err {
        NoteServiceError::NotFound(id) => {
            tracing::debug!("failed to {}: note {} not found", action, id);
            StatusCode::NOT_FOUND.into_response()
        }
        NoteServiceError::Storage(e) => {
            tracing::error!("failed to {}: {}", action, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_full_note_and_ignores_extra_fields() {
        let payload = decode_payload(
            br#"{"id": 5, "title": "T", "content": "C", "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(payload.title.as_deref(), Some("T"));
        assert_eq!(payload.content.as_deref(), Some("C"));
    }

    #[test]
    fn decode_treats_missing_and_null_fields_as_absent() {
        let payload = decode_payload(b"{}").unwrap();
        assert!(payload.title.is_none() && payload.content.is_none());

        let payload = decode_payload(br#"{"title": null, "content": "x"}"#).unwrap();
        assert!(payload.title.is_none());
        assert_eq!(payload.content.as_deref(), Some("x"));

        let payload = decode_payload(b"null").unwrap();
        assert!(payload.title.is_none() && payload.content.is_none());
    }

    #[test]
    fn decode_ignores_bytes_after_first_value() {
        let payload = decode_payload(br#"{"title": "a", "content": "b"} trailing"#).unwrap();

        assert_eq!(payload.title.as_deref(), Some("a"));
        assert_eq!(payload.content.as_deref(), Some("b"));
    }

    #[test]
    fn decode_rejects_garbage_and_wrong_types() {
        let bodies: [&[u8]; 7] = [
            b"not json",
            br#"{"title": 1, "content": "C"}"#,
            br#"{"title": "t", "content": ["C"]}"#,
            br#"{"title": "unterminated"#,
            b"[]",
            b"\"text\"",
            b"",
        ];

        for body in bodies {
            let response = decode_payload(body).unwrap_err();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = error_response("get note", &NoteServiceError::NotFound("1".to_string()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_error_maps_to_500() {
        let response = error_response(
            "get note",
            &NoteServiceError::Storage(sqlx::Error::PoolClosed),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn json_response_sets_content_type() {
        let response = json_response(StatusCode::CREATED, &vec![1, 2, 3]);

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn openapi_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| *p == "/note"));
        assert!(paths.iter().any(|p| *p == "/note/{id}"));
        assert!(paths.iter().any(|p| *p == "/notes"));
    }
}

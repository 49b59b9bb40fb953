use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

const MAX_REJECTION_BODY: usize = 64 * 1024;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REJECTION_BODY)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

/// Field path from a serde rejection such as
/// `Failed to deserialize the JSON body into the target type: year: invalid type ...`.
fn field_path_from_serde_msg(msg: &str) -> Option<String> {
    let rest = msg.split_once("target type: ")?.1;
    let (path, _) = rest.split_once(": ")?;
    let path = path.trim();
    let looks_like_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    looks_like_path.then(|| path.to_string())
}

fn hint_for(msg: &str) -> Option<String> {
    if msg.contains("missing field `query`") {
        Some("Send a non-empty \"query\" string.".into())
    } else if msg.contains("expected a sequence") {
        Some("Expected an array for this field (e.g. [{\"role\": \"user\", \"content\": \"...\"}]).".into())
    } else if msg.contains("expected a map") || msg.contains("expected struct") {
        Some("Expected a JSON object here (e.g. { \"field\": \"value\" }).".into())
    } else if msg.contains("Content-Type") {
        Some("Set the header Content-Type: application/json.".into())
    } else {
        None
    }
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) -> String {
    if let Some(v) = parts
        .headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        return v.to_string();
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let id = format!("req-{nanos}");
    if let Ok(value) = HeaderValue::from_str(&id) {
        parts.headers.insert("x-request-id", value);
    }
    id
}

/// Rewrites plain-text extractor rejections (400/415/422) into the JSON error
/// envelope. Responses that are already JSON pass through untouched.
pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    let mapped = matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::UNSUPPORTED_MEDIA_TYPE
    );
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !mapped || is_json {
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    let original = String::from_utf8_lossy(&bytes);
    let request_id = ensure_request_id(&mut parts);
    tracing::debug!(%request_id, %status, body = %original.trim(), "mapping extractor rejection");

    let detail = ApiErrorDetail {
        path: field_path_from_serde_msg(&original),
        hint: hint_for(&original),
    };
    let code = match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        _ => "UNPROCESSABLE_ENTITY",
    };
    let envelope = ApiResponse::<()>::error(code, original.trim(), vec![detail]);

    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_field_path() {
        let msg = "Failed to deserialize the JSON body into the target type: n_results: invalid type: string \"x\", expected u64 at line 1 column 30";
        assert_eq!(field_path_from_serde_msg(msg).as_deref(), Some("n_results"));

        let nested = "Failed to deserialize the JSON body into the target type: conversation_history[0].role: unknown variant `bot`";
        assert_eq!(
            field_path_from_serde_msg(nested).as_deref(),
            Some("conversation_history[0].role")
        );

        assert!(field_path_from_serde_msg("Expected request with `Content-Type: application/json`").is_none());
    }

    #[test]
    fn hints_for_common_mistakes() {
        assert!(hint_for("missing field `query` at line 1").is_some());
        assert!(hint_for("Expected request with `Content-Type: application/json`").is_some());
        assert!(hint_for("something else").is_none());
    }
}

//! Image upload and retrieval

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::{Json, Multipart, Path},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Longest file-name part kept in a blob key
const MAX_NAME_LEN: usize = 100;

/// Reduce a client file name to characters safe for a flat blob key
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Blob key of the form `<unix-millis>-<sanitized file name>`
fn blob_key(file_name: Option<&str>, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{}-{}", millis, sanitize_file_name(file_name.unwrap_or_default()))
}

/// Store the multipart `file` field and return its public URL
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    Multipart(mut multipart): Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let key = blob_key(field.file_name(), OffsetDateTime::now_utc());
        let bytes = field.bytes().await?;
        state.blobs.put(&key, &bytes).await?;

        tracing::info!(key = %key, size = bytes.len(), by = %user.username, "Image uploaded");
        return Ok(Json(UploadResponse {
            url: format!("{}/file/{}", state.config.public_base_url, key),
        }));
    }

    Err(ApiError::Validation("No file uploaded".to_string()))
}

/// Stream a stored image back with its media type
pub async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    // Keys that could never have been issued are simply absent
    let blob = match state.blobs.get(&filename).await {
        Ok(blob) => blob,
        Err(inkwell_shared::BlobError::InvalidKey(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let blob = blob.ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;
    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_millis(millis: i128) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).unwrap()
    }

    #[test]
    fn test_blob_key_is_millis_and_file_name() {
        let key = blob_key(Some("holiday.JPG"), at_millis(1_700_000_000_123));
        assert_eq!(key, "1700000000123-holiday.JPG");
    }

    #[test]
    fn test_blob_key_sanitizes_file_name() {
        let now = at_millis(1_700_000_000_000);
        assert_eq!(blob_key(Some("my cat (1).png"), now), "1700000000000-my_cat__1_.png");
        assert_eq!(blob_key(Some("../../etc/passwd"), now), "1700000000000-passwd");
        assert_eq!(blob_key(Some("C:\\pics\\a.gif"), now), "1700000000000-a.gif");
        assert_eq!(blob_key(Some("a..b.png"), now), "1700000000000-a.b.png");
        assert_eq!(blob_key(Some("..."), now), "1700000000000-upload");
        assert_eq!(blob_key(None, now), "1700000000000-upload");
    }

    #[test]
    fn test_sanitized_keys_pass_blob_validation() {
        let now = at_millis(1_700_000_000_000);
        let long = "z".repeat(500);
        for name in ["../x", ".hidden", "a/b\\c", "", "ok.png", long.as_str()] {
            let key = blob_key(Some(name), now);
            assert!(!key.contains('/') && !key.contains('\\') && !key.contains(".."));
            assert!(!key.starts_with('.'));
            assert!(key.len() <= 14 + MAX_NAME_LEN);
        }
    }
}

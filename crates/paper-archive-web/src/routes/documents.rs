//! Document routes - upload processing and deletion.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use paper_archive_core::{DeleteReport, DocumentId, OwnerId, RunReport, UploadOptions};
use std::sync::Arc;
use tracing::info;

use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::AppState;

fn parse_flag(value: &str) -> bool {
    matches!(value, "true" | "on" | "1" | "yes")
}

struct UploadRequest {
    pdf_bytes: Bytes,
    title: String,
    options: UploadOptions,
}

/// Decode the multipart upload form.
///
/// Fields: `file` (required), `title` (defaults to the filename without its
/// extension), `translate` and `dual_merge` flags. A decode error anywhere in
/// the stream is a 400 naming the multipart failure, not a silent truncation.
async fn parse_upload(mut multipart: Multipart) -> RouteResult<UploadRequest> {
    let mut pdf_bytes = None;
    let mut title = None;
    let mut options = UploadOptions::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart body: {e}"),
                ));
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                if title.is_none() {
                    title = field
                        .file_name()
                        .map(|f| f.trim_end_matches(".pdf").to_string());
                }
                pdf_bytes = Some(field.bytes().await.or_bad_request()?);
            }
            "title" => {
                let text = field.text().await.or_bad_request()?;
                if !text.trim().is_empty() {
                    title = Some(text);
                }
            }
            "translate" => {
                options.translate = parse_flag(&field.text().await.or_bad_request()?);
            }
            "dual_merge" => {
                options.dual_merge = parse_flag(&field.text().await.or_bad_request()?);
            }
            _ => {}
        }
    }

    let Some(pdf_bytes) = pdf_bytes else {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    };
    if pdf_bytes.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Uploaded file is empty".to_string()));
    }

    // A dual merge has nothing to interleave without a translation, so
    // requesting it requests both (the CLI's `--dual` behaves the same way).
    if options.dual_merge {
        options.translate = true;
    }

    Ok(UploadRequest {
        pdf_bytes,
        title: title.unwrap_or_else(|| "untitled".to_string()),
        options,
    })
}

/// Upload a PDF and run it through the pipeline.
///
/// The response reports per-stage outcomes, so a degraded run (translation
/// failed, source archived) still returns 200 with the failure tagged in the
/// body.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    multipart: Multipart,
) -> RouteResult<Json<RunReport>> {
    let owner = OwnerId::new(owner).or_status()?;
    let request = parse_upload(multipart).await?;

    info!(
        "Upload for {}: '{}' ({} bytes, translate={}, dual_merge={})",
        owner,
        request.title,
        request.pdf_bytes.len(),
        request.options.translate,
        request.options.dual_merge
    );

    let report = state
        .archive
        .upload_and_process(owner, &request.title, request.pdf_bytes, request.options)
        .await
        .or_status()?;

    Ok(Json(report))
}

/// Delete every artifact of a document.
///
/// Returns the full report either way; `failed` is non-empty when some keys
/// still exist and the caller should retry those.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path((owner, title, created_at)): Path<(String, String, u64)>,
) -> RouteResult<Json<DeleteReport>> {
    let owner = OwnerId::new(owner).or_status()?;
    let id = DocumentId::new(owner, &title, created_at);

    let report = state.archive.delete_document(id).await;
    Ok(Json(report))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};

    async fn multipart_from(body: &'static str) -> Multipart {
        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_parse_upload_reads_fields() {
        let body = "--BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\n\r\n\
            %PDF-1.4\r\n\
            --BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"translate\"\r\n\r\n\
            true\r\n\
            --BOUNDARY--\r\n";

        let request = parse_upload(multipart_from(body).await).await.unwrap();
        assert_eq!(request.title, "paper");
        assert_eq!(request.pdf_bytes, Bytes::from_static(b"%PDF-1.4"));
        assert!(request.options.translate);
        assert!(!request.options.dual_merge);
    }

    #[tokio::test]
    async fn test_dual_merge_implies_translate() {
        let body = "--BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\n\r\n\
            %PDF-1.4\r\n\
            --BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"dual_merge\"\r\n\r\n\
            true\r\n\
            --BOUNDARY--\r\n";

        let request = parse_upload(multipart_from(body).await).await.unwrap();
        assert!(request.options.dual_merge);
        assert!(request.options.translate);
    }

    #[tokio::test]
    async fn test_truncated_body_is_bad_request() {
        // Stream ends mid-field, before any closing boundary.
        let body = "--BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\n\r\n\
            %PDF-1.4";

        let (status, message) = parse_upload(multipart_from(body).await)
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("Malformed multipart body"), "{message}");
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let body = "--BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            paper\r\n\
            --BOUNDARY--\r\n";

        let (status, message) = parse_upload(multipart_from(body).await)
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "No file uploaded");
    }
}

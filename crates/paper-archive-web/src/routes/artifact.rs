//! Artifact route - proxied artifact content with revalidation.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use paper_archive_core::naming;
use serde::Deserialize;
use std::sync::Arc;

use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    /// Serve as an attachment instead of inline.
    #[serde(default)]
    download: bool,
}

/// Proxy one artifact's bytes from the archive store.
///
/// The path is the artifact key itself (`{owner}/{file}`); anything that
/// doesn't decode as a well-formed key is rejected before the store is
/// touched, so the store never sees an attacker-shaped path. Responses carry
/// a content ETag and honor `If-None-Match`.
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path((owner, file)): Path<(String, String)>,
    Query(query): Query<ArtifactQuery>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let key = format!("{owner}/{file}");
    let Some((id, variant)) = naming::decode(&key) else {
        return Err((StatusCode::BAD_REQUEST, format!("Malformed artifact key: {key}")));
    };

    let bytes = state.archive.fetch_artifact(&id, variant).await.or_status()?;

    let etag = format!("\"{:x}\"", md5::compute(&bytes));
    if let Some(inm) = headers.get(header::IF_NONE_MATCH)
        && inm.to_str().is_ok_and(|v| v == etag)
    {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, etag)
            .body(Body::empty())
            .or_internal_error();
    }

    let disposition = if query.download {
        format!("attachment; filename=\"{file}\"")
    } else {
        "inline".to_string()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, variant.content_type())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(bytes))
        .or_internal_error()
}

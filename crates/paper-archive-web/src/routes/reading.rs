//! Reading routes - session lifecycle and scroll sync.
//!
//! A session pins one artifact's text and its position map in memory; the
//! sync endpoints are then pure lookups. The text view drives and the source
//! page view follows.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use paper_archive_core::{Checkpoint, DocumentId, OwnerId, Variant};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::helpers::{CoreResultExt, OptionExt, RouteResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OpenedSession {
    pub session_id: String,
    pub variant: Variant,
    pub page_count: usize,
    pub checkpoints: Vec<Checkpoint>,
    pub text: String,
}

/// Open a reading session for a document.
///
/// Fetches the reading text (translation preferred, dual merge as fallback)
/// and builds the position map from its page-break markers.
pub async fn open_reading(
    State(state): State<Arc<AppState>>,
    Path((owner, title, created_at)): Path<(String, String, u64)>,
) -> RouteResult<Json<OpenedSession>> {
    let owner = OwnerId::new(owner).or_status()?;
    let id = DocumentId::new(owner, &title, created_at);

    let (text, variant) = state.archive.reading_text(&id).await.or_status()?;
    let session_id = state.create_session(text.clone(), variant).await;

    let session = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;
    let (page_count, checkpoints) = session
        .with_session(|s| (s.map.page_count(), s.map.checkpoints().to_vec()))
        .await
        .or_not_found("Session not found")?;

    info!("Opened reading session {} for {} ({})", session_id, id, variant);

    Ok(Json(OpenedSession {
        session_id,
        variant,
        page_count,
        checkpoints,
        text,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    /// Text offset at the top of the visible window.
    pub top: usize,
    /// Visible window span in text offsets.
    pub span: usize,
}

#[derive(Debug, Serialize)]
pub struct PageCommand {
    pub page: usize,
}

/// Scroll sync: page the source view should display for the current text
/// viewport. Anticipation is applied server-side so every client agrees.
pub async fn sync_position(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<SyncQuery>,
) -> RouteResult<Json<PageCommand>> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let policy = state.sync_policy();
    let page = session
        .with_session(|s| policy.page_command(&s.map, query.top, query.span))
        .await
        .or_not_found("Session not found")?;

    Ok(Json(PageCommand { page }))
}

#[derive(Debug, Deserialize)]
pub struct OffsetQuery {
    pub page: usize,
}

#[derive(Debug, Serialize)]
pub struct OffsetReply {
    pub offset: usize,
}

/// Inverse lookup: text offset to jump to when the reader navigates the
/// source view to a page.
pub async fn offset_for_page(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<OffsetQuery>,
) -> RouteResult<Json<OffsetReply>> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let offset = session
        .with_session(|s| s.map.offset_for_page(query.page))
        .await
        .or_not_found("Session not found")?;

    Ok(Json(OffsetReply { offset }))
}

/// Close a reading session.
pub async fn close_reading(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<StatusCode> {
    if state.close_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Session not found".to_string()))
    }
}

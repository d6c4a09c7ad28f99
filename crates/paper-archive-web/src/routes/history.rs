//! History route - the per-owner document listing.

use axum::{
    extract::{Path, State},
    Json,
};
use paper_archive_core::{HistoryEntry, OwnerId};
use std::sync::Arc;

use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

/// List an owner's documents, most recent first.
///
/// Rebuilt from a fresh store listing on every call, so out-of-band changes
/// to the archive repository show up immediately.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> RouteResult<Json<Vec<HistoryEntry>>> {
    let owner = OwnerId::new(owner).or_status()?;
    let entries = state.archive.history(&owner).await.or_status()?;
    Ok(Json(entries))
}

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SessionClosed {
    user_id: String,
    closed: bool,
}

/// Drops the user's cached hierarchies and invalidates in-flight selections.
pub(super) async fn close_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Json<ApiResponse<SessionClosed>> {
    let closed = state.sessions.close(&user_id).await;
    tracing::debug!(user_id = %user_id, closed, "closed view session");

    Json(ApiResponse {
        data: SessionClosed { user_id, closed },
        meta: ResponseMeta::new(req_id.0),
    })
}

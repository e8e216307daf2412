use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use synclog_core::{SourceDetail, SyncRun, UrlResult};
use synclog_engine::Selection;

use crate::middleware::RequestId;

use super::{map_reconstruct_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HierarchyQuery {
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RunHierarchyData {
    run: SyncRun,
    sources: Vec<SourceDetail>,
    urls: Vec<UrlResult>,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRun>>>, ApiError> {
    let limit = normalize_limit(query.limit, state.runs_page_size);
    let data = synclog_engine::list_runs(state.log.as_ref(), &user_id, limit)
        .await
        .map_err(|e| map_reconstruct_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_run_hierarchy(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, run_id)): Path<(String, String)>,
    Query(query): Query<HierarchyQuery>,
) -> Result<Json<ApiResponse<RunHierarchyData>>, ApiError> {
    let session = state.sessions.session(&user_id).await;
    let (run, selection) = session
        .select_by_id(&run_id)
        .await
        .map_err(|e| map_reconstruct_error(req_id.0.clone(), &e))?;

    let hierarchy = match selection {
        Selection::Ready(hierarchy) => hierarchy,
        Selection::Superseded => {
            return Err(ApiError::new(
                req_id.0,
                "superseded",
                "a newer run selection replaced this request",
            ));
        }
    };

    let urls = match query.source.as_deref() {
        Some(label) => hierarchy.urls_for_source(label).cloned().collect(),
        None => hierarchy.urls.clone(),
    };

    Ok(Json(ApiResponse {
        data: RunHierarchyData {
            run,
            sources: hierarchy.sources.clone(),
            urls,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

use axum::extract::State;
use axum::Extension;

use crate::database::models::TenantSummary;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::state::AppState;

/// GET /books/stats - Inventory dashboard for the caller's tenant
pub async fn stats(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<TenantSummary> {
    let summary = state.books.summary(&caller).await?;

    Ok(ApiResponse::success(summary))
}

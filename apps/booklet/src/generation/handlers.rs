//! Axum route handlers for the Booklet API.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::RunConfig;
use crate::errors::AppError;
use crate::generation::generator::{generate_booklet, plan_booklet, RunStats};
use crate::layout::LayoutDescription;
use crate::render::PageFormat;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub layout: LayoutDescription,
    pub stats: RunStats,
    /// Physical page count, known only for line-budget plans.
    pub page_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PageFormatInfo {
    pub name: String,
    pub size: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/booklets/plan
///
/// Fetches and plans a booklet, returning the layout description without rendering.
pub async fn handle_plan(
    State(state): State<AppState>,
    Json(request): Json<RunConfig>,
) -> Result<Json<PlanResponse>, AppError> {
    let planned = plan_booklet(&request, state.source.as_ref(), state.log.as_ref()).await?;
    let page_count = planned.layout.page_count();

    Ok(Json(PlanResponse {
        layout: planned.layout,
        stats: planned.stats,
        page_count,
    }))
}

/// POST /api/v1/booklets
///
/// Full pipeline. Responds with the rendered document in the requested output format.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<RunConfig>,
) -> Result<Response, AppError> {
    let renderer = state.renderer_for(request.output_format);
    let booklet = generate_booklet(
        &request,
        state.source.as_ref(),
        renderer.as_ref(),
        state.log.as_ref(),
    )
    .await?;

    Ok(([(header::CONTENT_TYPE, booklet.content_type)], booklet.bytes).into_response())
}

/// GET /api/v1/page-formats
pub async fn handle_page_formats() -> Json<Vec<PageFormatInfo>> {
    Json(
        PageFormat::ALL
            .iter()
            .map(|format| PageFormatInfo {
                name: format.to_string(),
                size: format.css_size(),
            })
            .collect(),
    )
}

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::{ApiResult, AppState, CurrentAdmin};
use crate::services::reports::{ReportPeriod, SalesReport, TopSelling, DEFAULT_TOP_LIMIT};

#[derive(Debug, Deserialize)]
pub(super) struct SalesParams {
    period: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TopParams {
    limit: Option<usize>,
}

pub(super) async fn sales_report(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Query(params): Query<SalesParams>,
) -> ApiResult<Json<SalesReport>> {
    let period: ReportPeriod = params.period.parse()?;
    Ok(Json(s.services.reports.sales_report(period).await?))
}

pub(super) async fn top_selling(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Query(params): Query<TopParams>,
) -> ApiResult<Json<TopSelling>> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 100);
    Ok(Json(s.services.reports.top_selling(limit).await?))
}

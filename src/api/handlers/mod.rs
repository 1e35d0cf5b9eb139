use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::models::*;
use planner_core::{calendar, ItemStore, MemberStore, PlanError, Planner, SprintStore};

type AppState = State<Planner<Database>>;

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Plan(e) => match e {
                PlanError::Validation(_)
                | PlanError::InvalidPosition { .. }
                | PlanError::InvalidSprint(_) => StatusCode::BAD_REQUEST,
                PlanError::NotFound { .. } => StatusCode::NOT_FOUND,
                PlanError::SprintOverlap { .. } => StatusCode::CONFLICT,
                PlanError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// Client errors carry their message. Store failures are logged in full
/// and answered with a generic message.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            tracing::warn!("Request rejected: {}", self);
            self.to_string()
        };
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Sprints
// ============================================================

pub async fn list_sprints(State(planner): AppState) -> ApiResult<Json<Vec<Sprint>>> {
    Ok(Json(planner.store().list_sprints()?))
}

pub async fn create_sprint(
    State(planner): AppState,
    Json(input): Json<NewSprint>,
) -> ApiResult<(StatusCode, Json<Sprint>)> {
    let sprint = planner.store().create_sprint(input)?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

pub async fn get_sprint(State(planner): AppState, Path(id): Path<i64>) -> ApiResult<Json<Sprint>> {
    planner
        .store()
        .find_sprint(id)?
        .map(Json)
        .ok_or_else(|| PlanError::not_found("sprint", id).into())
}

pub async fn update_sprint(
    State(planner): AppState,
    Path(id): Path<i64>,
    Json(input): Json<NewSprint>,
) -> ApiResult<Json<Sprint>> {
    Ok(Json(planner.store().update_sprint(id, input)?))
}

pub async fn delete_sprint(State(planner): AppState, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if planner.store().delete_sprint(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PlanError::not_found("sprint", id).into())
    }
}

/// Query string for the timeline view, e.g. `?kinds=story,subtask&member_id=3`.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub kinds: Option<String>,
    pub member_id: Option<i64>,
}

impl TimelineQuery {
    fn into_filter(self) -> ApiResult<TimelineFilter> {
        let kinds = match self.kinds.as_deref() {
            None => Vec::new(),
            Some(list) => parse_kinds(list).map_err(ApiError::BadRequest)?,
        };
        Ok(TimelineFilter {
            kinds,
            member_id: self.member_id,
        })
    }
}

/// Parse a comma-separated list of kinds. Blank entries are skipped.
pub fn parse_kinds(list: &str) -> Result<Vec<ItemKind>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ItemKind::from_str(s).ok_or_else(|| format!("unknown item kind '{s}'")))
        .collect()
}

pub async fn get_timeline(
    State(planner): AppState,
    Path(id): Path<i64>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<SprintTimeline>> {
    let filter = query.into_filter()?;
    Ok(Json(planner.sprint_timeline(id, &filter)?))
}

pub async fn get_workload(
    State(planner): AppState,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<MemberLoad>>> {
    Ok(Json(planner.member_workload(id)?))
}

pub async fn list_sprint_items(
    State(planner): AppState,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<WorkItem>>> {
    if planner.store().find_sprint(id)?.is_none() {
        return Err(PlanError::not_found("sprint", id).into());
    }
    Ok(Json(planner.store().list_by_sprint(id)?))
}

// ============================================================
// Members
// ============================================================

pub async fn list_members(State(planner): AppState) -> ApiResult<Json<Vec<Member>>> {
    Ok(Json(planner.store().list_members()?))
}

pub async fn create_member(
    State(planner): AppState,
    Json(input): Json<NewMember>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("member name is required".into()));
    }
    let member = planner.store().create_member(input)?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member(State(planner): AppState, Path(id): Path<i64>) -> ApiResult<Json<Member>> {
    planner
        .store()
        .find_member(id)?
        .map(Json)
        .ok_or_else(|| PlanError::not_found("member", id).into())
}

pub async fn delete_member(State(planner): AppState, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if planner.store().delete_member(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PlanError::not_found("member", id).into())
    }
}

// ============================================================
// Work items
// ============================================================

pub async fn create_item(
    State(planner): AppState,
    Json(mut draft): Json<WorkItemDraft>,
) -> ApiResult<(StatusCode, Json<WorkItem>)> {
    draft.id = None;
    let item = planner.save_item(draft)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(State(planner): AppState, Path(id): Path<i64>) -> ApiResult<Json<WorkItem>> {
    planner
        .store()
        .find_item(id)?
        .map(Json)
        .ok_or_else(|| PlanError::not_found("item", id).into())
}

pub async fn update_item(
    State(planner): AppState,
    Path(id): Path<i64>,
    Json(mut draft): Json<WorkItemDraft>,
) -> ApiResult<Json<WorkItem>> {
    draft.id = Some(id);
    Ok(Json(planner.save_item(draft)?))
}

pub async fn delete_item(State(planner): AppState, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if planner.delete_item(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PlanError::not_found("item", id).into())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub error: Option<String>,
}

/// Dry-run validation. Rule violations are reported in the body, not as an
/// error status.
pub async fn validate_item(
    State(planner): AppState,
    Json(draft): Json<WorkItemDraft>,
) -> ApiResult<Json<ValidationReport>> {
    let report = match planner.validate(&draft) {
        Ok(()) => ValidationReport {
            valid: true,
            error: None,
        },
        Err(PlanError::Validation(e)) => ValidationReport {
            valid: false,
            error: Some(e.to_string()),
        },
        Err(e) => return Err(e.into()),
    };
    Ok(Json(report))
}

pub async fn list_subtasks(
    State(planner): AppState,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<WorkItem>>> {
    Ok(Json(planner.ordered_subtasks(id)?))
}

pub async fn initialize_priorities(
    State(planner): AppState,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let updated = planner.initialize_priorities(id)?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReorderInput {
    pub position: usize,
}

/// Move a Subtask to `position` among its siblings and return the new order.
pub async fn reorder_item(
    State(planner): AppState,
    Path(id): Path<i64>,
    Json(input): Json<ReorderInput>,
) -> ApiResult<Json<Vec<WorkItem>>> {
    Ok(Json(planner.reorder(id, input.position)?))
}

// ============================================================
// Calendar
// ============================================================

#[derive(Debug, Deserialize)]
pub struct EndDateQuery {
    pub start: NaiveDate,
    pub weeks: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndDateResponse {
    pub start: NaiveDate,
    pub weeks: u32,
    pub end_date: NaiveDate,
    pub business_days: u32,
}

pub async fn end_date(Query(query): Query<EndDateQuery>) -> ApiResult<Json<EndDateResponse>> {
    if query.weeks == 0 {
        return Err(ApiError::BadRequest("weeks must be at least 1".into()));
    }
    let end = calendar::end_date(query.start, query.weeks).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "{} weeks from {} is past the supported date range",
            query.weeks, query.start
        ))
    })?;
    Ok(Json(EndDateResponse {
        start: query.start,
        weeks: query.weeks,
        end_date: end,
        business_days: calendar::business_day_count(query.start, end),
    }))
}

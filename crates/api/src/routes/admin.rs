//! Admin listing of stored submissions.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use intake_core::{limits::DEFAULT_LIST_LIMIT, Error, FieldErrors};
use serde::Deserialize;
use validator::Validate;

use crate::response::{ApiError, SubmissionListResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListQuery {
    /// Page size, 1 to 500
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: Option<u32>,
}

/// GET /api/admin/submissions - Most recent submissions first.
pub async fn list_submissions(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<SubmissionListResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    query.validate().map_err(|e| {
        let errors: FieldErrors = e
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|err| err.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .collect();
        ApiError::validation(errors)
    })?;

    let Some(store) = &state.store else {
        return Err(Error::config("no submission store configured").into());
    };

    let submissions = store
        .recent(query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;

    Ok(Json(SubmissionListResponse {
        success: true,
        count: submissions.len(),
        submissions,
    }))
}

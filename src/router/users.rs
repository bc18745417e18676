//! Users-related HTTP API.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::account::AccountAge;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct Params {
    name: Option<String>,
}

pub fn router() -> Router<AppState> {
    // `GET /users/platform-age` goes to `platform_age`.
    Router::new().route("/platform-age", get(platform_age))
}

/// Tell how many days an account has existed.
pub async fn platform_age(
    State(state): State<AppState>,
    query: std::result::Result<Query<Params>, QueryRejection>,
) -> Result<Json<AccountAge>> {
    let Query(params) = query?;
    let name = state.validator.validate(params.name.as_deref())?;
    let age = state.accounts.get_account_age(&name).await?;

    Ok(Json(age))
}

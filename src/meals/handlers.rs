use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{dto::MealRecord, services};
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/logMeal", post(log_meal))
}

/// POST /api/logMeal
/// Authorization: <firebase id token>, body `{name, calories, type}`
#[instrument(skip(state, meal))]
pub async fn log_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(meal): Json<MealRecord>,
) -> Result<String, AppError> {
    let confirmation = services::log_meal(state.store.as_ref(), &user_id, meal).await?;
    Ok(confirmation.message())
}

//! JSON endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error::AppError, state::AppState};
use crate::competitor::{Category, ScoreInput};
use crate::scoring::{build_leaderboard, Leaderboard};

fn default_attempts() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ScorePayload {
    #[serde(alias = "competitor_id")]
    competitor_number: u32,
    climb_number: u32,
    /// Signed so that zero or negative counts clamp to one instead of failing.
    #[serde(default = "default_attempts")]
    attempts: i64,
    #[serde(default)]
    topped: bool,
}

#[derive(Debug, Serialize)]
pub struct SavedScore {
    ok: bool,
    competitor_number: u32,
    climb_number: u32,
    attempts: u32,
    topped: bool,
    points: u32,
}

#[derive(Debug, Serialize)]
pub struct ScoreLine {
    climb_number: u32,
    attempts: u32,
    topped: bool,
    points: u32,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    category: Option<String>,
}

pub async fn save_score(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScorePayload>, JsonRejection>,
) -> Result<Json<SavedScore>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        debug!("Rejected score payload: {e}");
        AppError::MalformedPayload
    })?;

    let input = ScoreInput {
        climb_number: payload.climb_number,
        attempts: u32::try_from(payload.attempts.max(1)).unwrap_or(u32::MAX),
        topped: payload.topped,
    };
    let (score, points) = state.submit_score(payload.competitor_number, input).await?;

    Ok(Json(SavedScore {
        ok: true,
        competitor_number: payload.competitor_number,
        climb_number: score.climb_number,
        attempts: score.attempts,
        topped: score.topped,
        points,
    }))
}

pub async fn get_scores(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> Result<Json<Vec<ScoreLine>>, AppError> {
    let scores = {
        let storage = state.storage.lock().await;
        storage.require_competitor(number)?;
        storage.scores_for(number)?
    };

    let lines = scores
        .into_iter()
        .map(|s| ScoreLine {
            points: state.rules.points_for(s.climb_number, s.attempts, s.topped),
            climb_number: s.climb_number,
            attempts: s.attempts,
            topped: s.topped,
        })
        .collect();
    Ok(Json(lines))
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Leaderboard>, AppError> {
    let filter = Category::from_filter(query.category.as_deref());
    let board = current_leaderboard(&state, filter).await?;
    Ok(Json(board))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Rank everyone in the store for the given category.
pub(super) async fn current_leaderboard(
    state: &AppState,
    filter: Option<Category>,
) -> Result<Leaderboard, AppError> {
    let (competitors, scores) = {
        let storage = state.storage.lock().await;
        (storage.list_competitors()?, storage.all_scores()?)
    };
    Ok(build_leaderboard(&state.rules, &competitors, &scores, filter))
}

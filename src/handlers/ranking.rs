use crate::error::AppError;
use crate::models::ranking::RankingQuery;
use crate::services::ranking as service;
use crate::state::AppState;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn get_ranking(
    state: web::types::State<Arc<AppState>>,
    query: web::types::Query<RankingQuery>,
) -> Result<HttpResponse, AppError> {
    let board = service::board(
        state.db.as_ref(),
        &state.mirror,
        state.config.ranking_source,
        query.user_id.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(&board))
}

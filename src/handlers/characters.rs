use crate::error::AppError;
use crate::models::character::*;
use crate::services::progression::CATALOG;
use crate::state::AppState;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn get_catalog() -> HttpResponse {
    HttpResponse::Ok().json(&CATALOG)
}

pub async fn get_sheet(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
    query: web::types::Query<CharacterQuery>,
) -> Result<HttpResponse, AppError> {
    let sheet = state
        .progression()
        .sheet(&path.into_inner(), query.selected.as_deref())?;
    Ok(HttpResponse::Ok().json(&sheet))
}

pub async fn level_up(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, character_id) = path.into_inner();
    let result = state.progression().level_up(&user_id, &character_id)?;
    Ok(HttpResponse::Ok().json(&result))
}

pub async fn add_exp(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<(String, String)>,
    body: web::types::Json<ExpRequest>,
) -> Result<HttpResponse, AppError> {
    let (user_id, character_id) = path.into_inner();
    let result = state
        .progression()
        .add_exp(&user_id, &character_id, body.amount)?;
    Ok(HttpResponse::Ok().json(&result))
}

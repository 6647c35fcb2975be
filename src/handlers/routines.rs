use crate::error::AppError;
use crate::models::routine::*;
use crate::state::AppState;
use crate::validation;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn get_day(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, date) = path.into_inner();
    let date = validation::parse_date(&date)?;
    let day = state.routines().day(&user_id, date)?;
    Ok(HttpResponse::Ok().json(&day))
}

pub async fn submit(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
    body: web::types::Json<RoutineSubmission>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let req = body.into_inner();
    let result = state
        .routines()
        .submit(&user_id, req.date, &req.text, state.config.now())?;
    Ok(HttpResponse::Ok().json(&result))
}

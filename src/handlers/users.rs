use crate::error::AppError;
use crate::models::user::*;
use crate::services::{events, identity, visitor};
use crate::state::AppState;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;
use std::time::Duration;

const BALANCE_WAIT: Duration = Duration::from_secs(25);

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

fn visit_context(req: &HttpRequest, uv: Option<&str>) -> visitor::VisitContext {
    let ip = header(req, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .or_else(|| req.peer_addr().map(|a| a.ip().to_string()));
    visitor::VisitContext::new(ip, header(req, "user-agent"), uv)
}

pub async fn login(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    body: web::types::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let (user, is_new) = identity::login(state.db.as_ref(), &state.mirror, &body.name, &body.password)?;
    let ctx = visit_context(&req, body.uv.as_deref());
    visitor::record_visit(&state.mirror, &ctx, &user.id, state.config.now());
    let balance = state.ledger().balance(&user.id)?;
    Ok(HttpResponse::Ok().json(&LoginResult {
        user,
        is_new,
        balance,
        uv: ctx.uv,
    }))
}

pub async fn get_balance(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let balance = state.ledger().balance(&user_id)?;
    Ok(HttpResponse::Ok().json(&BalanceView { user_id, balance }))
}

/// Long poll: answers once the balance differs from `since`, or after
/// [`BALANCE_WAIT`] with the unchanged value.
pub async fn wait_balance(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
    query: web::types::Query<BalanceWaitQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let balance = events::wait_for_balance(
        state.db.as_ref(),
        &state.events,
        &user_id,
        query.since,
        BALANCE_WAIT,
    )
    .await?;
    Ok(HttpResponse::Ok().json(&BalanceView { user_id, balance }))
}

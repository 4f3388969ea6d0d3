//! Dashboard route handlers
//!
//! Each handler is a thin adapter over `BudgetApi` or the gateway's
//! session calls; recovery from expired tokens happens inside the gateway.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use budget_api::{CategoryFilters, DashboardSummary, GoalFilters, TransactionFilters};
use budget_auth::{LOGIN_ENTRY_POINT, RegisterRequest};
use common::Secret;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::AppError;
use crate::route_guard::safe_redirect;
use crate::state::AppState;

type HandlerResult<T> = std::result::Result<T, AppError>;

/// `?redirect=` carried through the login flow
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub redirect: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// `GET /auth/login`
pub async fn login_page(Query(query): Query<RedirectQuery>) -> Json<Value> {
    Json(json!({
        "login": LOGIN_ENTRY_POINT,
        "method": "POST",
        "redirect": safe_redirect(query.redirect.as_deref()),
    }))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
    Json(form): Json<LoginForm>,
) -> HandlerResult<Json<Value>> {
    let password = Secret::new(form.password);
    let user = state.gateway().sign_in(&form.email, &password).await?;
    Ok(Json(json!({
        "user": user,
        "redirect": safe_redirect(query.redirect.as_deref()),
    })))
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> HandlerResult<impl IntoResponse> {
    let gateway = state.gateway();
    let request = RegisterRequest {
        email: form.email,
        password: form.password,
        name: form.name,
    };
    let registered =
        budget_auth::register(gateway.http_client(), gateway.base_url(), &request).await?;
    info!(email = %registered.user.email, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": registered.user, "login": LOGIN_ENTRY_POINT })),
    ))
}

/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>) -> HandlerResult<Json<Value>> {
    state.gateway().sign_out().await?;
    Ok(Json(json!({ "signed_out": true, "login": LOGIN_ENTRY_POINT })))
}

/// `GET /`: profile plus headline figures over the first page of each list.
pub async fn dashboard(State(state): State<AppState>) -> HandlerResult<Json<Value>> {
    let transaction_filters = TransactionFilters::default();
    let goal_filters = GoalFilters::default();
    let transactions = state.api.transactions();
    let goals = state.api.goals();

    let (user, transactions, goals) = tokio::try_join!(
        state.api.me(),
        transactions.list(&transaction_filters),
        goals.list(&goal_filters),
    )?;

    let summary = DashboardSummary::build(&transactions.list, &goals.list);
    Ok(Json(json!({
        "user": user,
        "display_name": user.display_name(),
        "summary": summary,
        "recent_transactions": transactions.list,
        "goals": goals.list,
    })))
}

/// `GET /transactions`
pub async fn transactions(
    State(state): State<AppState>,
    Query(filters): Query<TransactionFilters>,
) -> HandlerResult<impl IntoResponse> {
    Ok(Json(state.api.transactions().list(&filters).await?))
}

/// `GET /categories`
pub async fn categories(
    State(state): State<AppState>,
    Query(filters): Query<CategoryFilters>,
) -> HandlerResult<impl IntoResponse> {
    Ok(Json(state.api.categories().list(&filters).await?))
}

/// `GET /goals`
pub async fn goals(
    State(state): State<AppState>,
    Query(filters): Query<GoalFilters>,
) -> HandlerResult<impl IntoResponse> {
    Ok(Json(state.api.goals().list(&filters).await?))
}

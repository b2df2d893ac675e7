use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

use super::{AppError, AppState};
use crate::forms::{FieldErrors, SubmittedForm};

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let mut ctx = state.page(&session, "Sign in").await;
    ctx.insert("errors", &FieldErrors::new());
    state.render("login.html", &ctx)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: SubmittedForm,
) -> Result<Response, AppError> {
    if state.gate.verify(form.text("password")).await? {
        state.gate.sign_in(&session).await?;
        info!("Admin signed in");
        return Ok(Redirect::to("/").into_response());
    }

    warn!("Failed sign-in attempt");
    let mut ctx = state.page(&session, "Sign in").await;
    ctx.insert("errors", &FieldErrors::single("password", "Incorrect password"));
    Ok(state.render("login.html", &ctx)?.into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Redirect, AppError> {
    state.gate.sign_out(&session).await?;
    Ok(Redirect::to("/"))
}

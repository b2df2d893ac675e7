use axum::{extract::State, response::Html};
use serde::Serialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{AppError, AppState};

#[derive(Debug, Serialize)]
struct Counts {
    games: u64,
    publishers: u64,
    genres: u64,
    platforms: u64,
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let store = &state.store;
    let (games, publishers, genres, platforms) = futures::try_join!(
        store.game_count(),
        store.publisher_count(),
        store.genre_count(),
        store.platform_count()
    )?;

    let mut ctx = state.page(&session, "Game Store Inventory").await;
    ctx.insert(
        "counts",
        &Counts {
            games,
            publishers,
            genres,
            platforms,
        },
    );
    state.render("index.html", &ctx)
}

use crate::domain::RecordId;
use crate::entities::{game_genres, genres, prelude::*};
use crate::models::Genre;
use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Genre>> {
        let rows = Genres::find()
            .order_by_asc(genres::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list genres")?;

        Ok(rows.into_iter().map(Genre::from).collect())
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Genre>> {
        let row = Genres::find_by_id(id.as_str()).one(&self.conn).await?;
        Ok(row.map(Genre::from))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<RecordId>> {
        let row = Genres::find()
            .filter(genres::Column::Name.eq(name))
            .one(&self.conn)
            .await?;

        Ok(row.map(|g| RecordId::from_stored(g.id)))
    }

    /// Returns the subset of `ids` that name stored genres, in input order.
    pub async fn existing_ids(&self, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<String> = Genres::find()
            .filter(genres::Column::Id.is_in(ids.iter().map(RecordId::as_str)))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        Ok(ids
            .iter()
            .filter(|id| found.iter().any(|f| f == id.as_str()))
            .cloned()
            .collect())
    }

    pub async fn add(&self, name: &str) -> Result<RecordId> {
        let id = RecordId::generate();

        Genres::insert(genres::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert genre")?;

        info!(resource = "genre", id = %id, "Genre created");
        Ok(id)
    }

    pub async fn update(&self, id: &RecordId, name: &str) -> Result<bool> {
        let result = Genres::update_many()
            .col_expr(genres::Column::Name, Expr::value(name))
            .filter(genres::Column::Id.eq(id.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update genre")?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes the genre and detaches it from every game.
    pub async fn remove(&self, id: &RecordId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let detached = GameGenres::delete_many()
            .filter(game_genres::Column::GenreId.eq(id.as_str()))
            .exec(&txn)
            .await?;

        let deleted = Genres::delete_by_id(id.as_str()).exec(&txn).await?;

        txn.commit().await?;

        if deleted.rows_affected > 0 {
            info!(
                resource = "genre",
                id = %id,
                detached_games = detached.rows_affected,
                "Genre deleted"
            );
        }
        Ok(deleted.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Genres::find().count(&self.conn).await?)
    }
}

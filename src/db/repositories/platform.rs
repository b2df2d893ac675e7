use crate::domain::RecordId;
use crate::entities::{game_platforms, platforms, prelude::*};
use crate::models::Platform;
use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

pub struct PlatformRepository {
    conn: DatabaseConnection,
}

impl PlatformRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Platform>> {
        let rows = Platforms::find()
            .order_by_asc(platforms::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list platforms")?;

        Ok(rows.into_iter().map(Platform::from).collect())
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Platform>> {
        let row = Platforms::find_by_id(id.as_str()).one(&self.conn).await?;
        Ok(row.map(Platform::from))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<RecordId>> {
        let row = Platforms::find()
            .filter(platforms::Column::Name.eq(name))
            .one(&self.conn)
            .await?;

        Ok(row.map(|g| RecordId::from_stored(g.id)))
    }

    /// Returns the subset of `ids` that name stored platforms, in input order.
    pub async fn existing_ids(&self, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<String> = Platforms::find()
            .filter(platforms::Column::Id.is_in(ids.iter().map(RecordId::as_str)))
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

        Platforms::insert(platforms::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert platform")?;

        info!(resource = "platform", id = %id, "Platform created");
        Ok(id)
    }

    pub async fn update(&self, id: &RecordId, name: &str) -> Result<bool> {
        let result = Platforms::update_many()
            .col_expr(platforms::Column::Name, Expr::value(name))
            .filter(platforms::Column::Id.eq(id.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update platform")?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes the platform and detaches it from every game.
    pub async fn remove(&self, id: &RecordId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let detached = GamePlatforms::delete_many()
            .filter(game_platforms::Column::PlatformId.eq(id.as_str()))
            .exec(&txn)
            .await?;

        let deleted = Platforms::delete_by_id(id.as_str()).exec(&txn).await?;

        txn.commit().await?;

        if deleted.rows_affected > 0 {
            info!(
                resource = "platform",
                id = %id,
                detached_games = detached.rows_affected,
                "Platform deleted"
            );
        }
        Ok(deleted.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Platforms::find().count(&self.conn).await?)
    }
}

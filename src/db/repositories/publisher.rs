use crate::domain::RecordId;
use crate::entities::{games, prelude::*, publishers};
use crate::models::Publisher;
use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

pub struct PublisherRepository {
    conn: DatabaseConnection,
}

impl PublisherRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Publisher>> {
        let rows = Publishers::find()
            .order_by_asc(publishers::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list publishers")?;

        Ok(rows.into_iter().map(Publisher::from).collect())
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Publisher>> {
        let row = Publishers::find_by_id(id.as_str()).one(&self.conn).await?;
        Ok(row.map(Publisher::from))
    }

    /// Names match ignoring ASCII case, the way SQLite's `LOWER` folds them.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<RecordId>> {
        let row = Publishers::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(publishers::Column::Name)))
                    .eq(name.to_ascii_lowercase()),
            )
            .one(&self.conn)
            .await?;

        Ok(row.map(|p| RecordId::from_stored(p.id)))
    }

    pub async fn add(&self, name: &str, country: &str) -> Result<RecordId> {
        let id = RecordId::generate();

        Publishers::insert(publishers::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            country: Set(country.to_string()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert publisher")?;

        info!(resource = "publisher", id = %id, "Publisher created");
        Ok(id)
    }

    pub async fn update(&self, id: &RecordId, name: &str, country: &str) -> Result<bool> {
        let result = Publishers::update_many()
            .col_expr(publishers::Column::Name, Expr::value(name))
            .col_expr(publishers::Column::Country, Expr::value(country))
            .filter(publishers::Column::Id.eq(id.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update publisher")?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes the publisher. Its games stay, with the publisher cleared.
    pub async fn remove(&self, id: &RecordId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let orphaned = Games::update_many()
            .col_expr(games::Column::PublisherId, Expr::value(Option::<String>::None))
            .filter(games::Column::PublisherId.eq(id.as_str()))
            .exec(&txn)
            .await?;

        let deleted = Publishers::delete_by_id(id.as_str()).exec(&txn).await?;

        txn.commit().await?;

        if deleted.rows_affected > 0 {
            info!(
                resource = "publisher",
                id = %id,
                orphaned_games = orphaned.rows_affected,
                "Publisher deleted"
            );
        }
        Ok(deleted.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Publishers::find().count(&self.conn).await?)
    }
}

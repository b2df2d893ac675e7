use crate::domain::RecordId;
use crate::entities::{
    game_genres, game_platforms, games, genres, platforms, prelude::*,
};
use crate::models::{Game, GameInput, GameLink, GameSummary, Genre, Platform, Publisher};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use tracing::info;

/// A game row together with the ids of its genres and platforms.
#[derive(Debug, Clone)]
pub struct StoredGame {
    pub model: games::Model,
    pub genre_ids: Vec<RecordId>,
    pub platform_ids: Vec<RecordId>,
}

pub struct GameRepository {
    conn: DatabaseConnection,
}

impl GameRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<GameSummary>> {
        let rows = Games::find()
            .find_also_related(Publishers)
            .order_by_asc(games::Column::Title)
            .order_by_asc(games::Column::Year)
            .all(&self.conn)
            .await
            .context("Failed to list games")?;

        Ok(rows
            .into_iter()
            .map(|(game, publisher)| GameSummary::new(game, publisher))
            .collect())
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Game>> {
        let Some(model) = Games::find_by_id(id.as_str()).one(&self.conn).await? else {
            return Ok(None);
        };

        let publisher = match &model.publisher_id {
            Some(publisher_id) => Publishers::find_by_id(publisher_id.as_str())
                .one(&self.conn)
                .await?
                .map(Publisher::from),
            None => None,
        };

        let genres = model
            .find_related(Genres)
            .order_by_asc(genres::Column::Name)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(Genre::from)
            .collect();

        let platforms = model
            .find_related(Platforms)
            .order_by_asc(platforms::Column::Name)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(Platform::from)
            .collect();

        Ok(Some(Game::new(model, publisher, genres, platforms)))
    }

    pub async fn get_stored(&self, id: &RecordId) -> Result<Option<StoredGame>> {
        let Some(model) = Games::find_by_id(id.as_str()).one(&self.conn).await? else {
            return Ok(None);
        };

        let genre_ids = GameGenres::find()
            .filter(game_genres::Column::GameId.eq(id.as_str()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| RecordId::from_stored(row.genre_id))
            .collect();

        let platform_ids = GamePlatforms::find()
            .filter(game_platforms::Column::GameId.eq(id.as_str()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| RecordId::from_stored(row.platform_id))
            .collect();

        Ok(Some(StoredGame {
            model,
            genre_ids,
            platform_ids,
        }))
    }

    pub async fn find_by_title_year(&self, title: &str, year: i32) -> Result<Option<RecordId>> {
        let row = Games::find()
            .filter(games::Column::Title.eq(title))
            .filter(games::Column::Year.eq(year))
            .one(&self.conn)
            .await?;

        Ok(row.map(|g| RecordId::from_stored(g.id)))
    }

    pub async fn add(&self, input: &GameInput, img_src: Option<String>) -> Result<RecordId> {
        let id = RecordId::generate();
        let txn = self.conn.begin().await?;

        Games::insert(games::ActiveModel {
            id: Set(id.to_string()),
            title: Set(input.title.clone()),
            publisher_id: Set(Some(input.publisher_id.to_string())),
            summary: Set(input.summary.clone()),
            year: Set(input.year),
            price: Set(input.price),
            number_in_stock: Set(input.number_in_stock.clone()),
            img_src: Set(img_src),
        })
        .exec_without_returning(&txn)
        .await
        .context("Failed to insert game")?;

        Self::link_references(&txn, &id, input).await?;

        txn.commit().await?;

        info!(resource = "game", id = %id, title = %input.title, "Game created");
        Ok(id)
    }

    /// Overwrites the game's fields and references. `img_src` replaces the
    /// stored image when present. Returns the row as it was before the write.
    pub async fn update(
        &self,
        id: &RecordId,
        input: &GameInput,
        img_src: Option<String>,
    ) -> Result<Option<games::Model>> {
        let txn = self.conn.begin().await?;

        let Some(previous) = Games::find_by_id(id.as_str()).one(&txn).await? else {
            return Ok(None);
        };

        let mut active: games::ActiveModel = previous.clone().into();
        active.title = Set(input.title.clone());
        active.publisher_id = Set(Some(input.publisher_id.to_string()));
        active.summary = Set(input.summary.clone());
        active.year = Set(input.year);
        active.price = Set(input.price);
        active.number_in_stock = Set(input.number_in_stock.clone());
        if let Some(src) = img_src {
            active.img_src = Set(Some(src));
        }
        active.update(&txn).await.context("Failed to update game")?;

        GameGenres::delete_many()
            .filter(game_genres::Column::GameId.eq(id.as_str()))
            .exec(&txn)
            .await?;
        GamePlatforms::delete_many()
            .filter(game_platforms::Column::GameId.eq(id.as_str()))
            .exec(&txn)
            .await?;
        Self::link_references(&txn, id, input).await?;

        txn.commit().await?;

        info!(resource = "game", id = %id, "Game updated");
        Ok(Some(previous))
    }

    /// Deletes the game and its reference rows, returning the deleted row.
    pub async fn remove(&self, id: &RecordId) -> Result<Option<games::Model>> {
        let txn = self.conn.begin().await?;

        let Some(previous) = Games::find_by_id(id.as_str()).one(&txn).await? else {
            return Ok(None);
        };

        GameGenres::delete_many()
            .filter(game_genres::Column::GameId.eq(id.as_str()))
            .exec(&txn)
            .await?;
        GamePlatforms::delete_many()
            .filter(game_platforms::Column::GameId.eq(id.as_str()))
            .exec(&txn)
            .await?;
        Games::delete_by_id(id.as_str()).exec(&txn).await?;

        txn.commit().await?;

        info!(resource = "game", id = %id, "Game deleted");
        Ok(Some(previous))
    }

    pub async fn by_publisher(&self, publisher_id: &RecordId) -> Result<Vec<GameLink>> {
        let rows = Games::find()
            .filter(games::Column::PublisherId.eq(publisher_id.as_str()))
            .order_by_asc(games::Column::Title)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(GameLink::from).collect())
    }

    pub async fn by_genre(&self, genre_id: &RecordId) -> Result<Vec<GameLink>> {
        let rows = Games::find()
            .join(JoinType::InnerJoin, games::Relation::GameGenres.def())
            .filter(game_genres::Column::GenreId.eq(genre_id.as_str()))
            .order_by_asc(games::Column::Title)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(GameLink::from).collect())
    }

    pub async fn by_platform(&self, platform_id: &RecordId) -> Result<Vec<GameLink>> {
        let rows = Games::find()
            .join(JoinType::InnerJoin, games::Relation::GamePlatforms.def())
            .filter(game_platforms::Column::PlatformId.eq(platform_id.as_str()))
            .order_by_asc(games::Column::Title)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(GameLink::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Games::find().count(&self.conn).await?)
    }

    pub async fn image_sources(&self) -> Result<Vec<String>> {
        let rows = Games::find()
            .filter(games::Column::ImgSrc.is_not_null())
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().filter_map(|g| g.img_src).collect())
    }

    async fn link_references<C: ConnectionTrait>(
        conn: &C,
        game_id: &RecordId,
        input: &GameInput,
    ) -> Result<()> {
        if !input.genre_ids.is_empty() {
            let rows: Vec<game_genres::ActiveModel> = input
                .genre_ids
                .iter()
                .map(|genre_id| game_genres::ActiveModel {
                    game_id: Set(game_id.to_string()),
                    genre_id: Set(genre_id.to_string()),
                })
                .collect();
            GameGenres::insert_many(rows).exec_without_returning(conn).await?;
        }

        if !input.platform_ids.is_empty() {
            let rows: Vec<game_platforms::ActiveModel> = input
                .platform_ids
                .iter()
                .map(|platform_id| game_platforms::ActiveModel {
                    game_id: Set(game_id.to_string()),
                    platform_id: Set(platform_id.to_string()),
                })
                .collect();
            GamePlatforms::insert_many(rows).exec_without_returning(conn).await?;
        }

        Ok(())
    }
}

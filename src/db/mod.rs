use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::RecordId;
use crate::entities::games;
use crate::models::{Game, GameInput, GameLink, GameSummary, Genre, Platform, Publisher};

pub mod migrator;
pub mod repositories;

pub use repositories::game::StoredGame;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn game_repo(&self) -> repositories::game::GameRepository {
        repositories::game::GameRepository::new(self.conn.clone())
    }

    fn publisher_repo(&self) -> repositories::publisher::PublisherRepository {
        repositories::publisher::PublisherRepository::new(self.conn.clone())
    }

    fn genre_repo(&self) -> repositories::genre::GenreRepository {
        repositories::genre::GenreRepository::new(self.conn.clone())
    }

    fn platform_repo(&self) -> repositories::platform::PlatformRepository {
        repositories::platform::PlatformRepository::new(self.conn.clone())
    }

    // Games

    pub async fn list_games(&self) -> Result<Vec<GameSummary>> {
        self.game_repo().list().await
    }

    pub async fn get_game(&self, id: &RecordId) -> Result<Option<Game>> {
        self.game_repo().get(id).await
    }

    pub async fn get_stored_game(&self, id: &RecordId) -> Result<Option<StoredGame>> {
        self.game_repo().get_stored(id).await
    }

    pub async fn find_game_by_title_year(&self, title: &str, year: i32) -> Result<Option<RecordId>> {
        self.game_repo().find_by_title_year(title, year).await
    }

    pub async fn add_game(&self, input: &GameInput, img_src: Option<String>) -> Result<RecordId> {
        self.game_repo().add(input, img_src).await
    }

    pub async fn update_game(
        &self,
        id: &RecordId,
        input: &GameInput,
        img_src: Option<String>,
    ) -> Result<Option<games::Model>> {
        self.game_repo().update(id, input, img_src).await
    }

    pub async fn remove_game(&self, id: &RecordId) -> Result<Option<games::Model>> {
        self.game_repo().remove(id).await
    }

    pub async fn games_by_publisher(&self, id: &RecordId) -> Result<Vec<GameLink>> {
        self.game_repo().by_publisher(id).await
    }

    pub async fn games_by_genre(&self, id: &RecordId) -> Result<Vec<GameLink>> {
        self.game_repo().by_genre(id).await
    }

    pub async fn games_by_platform(&self, id: &RecordId) -> Result<Vec<GameLink>> {
        self.game_repo().by_platform(id).await
    }

    pub async fn game_count(&self) -> Result<u64> {
        self.game_repo().count().await
    }

    pub async fn game_image_sources(&self) -> Result<Vec<String>> {
        self.game_repo().image_sources().await
    }

    // Publishers

    pub async fn list_publishers(&self) -> Result<Vec<Publisher>> {
        self.publisher_repo().list().await
    }

    pub async fn get_publisher(&self, id: &RecordId) -> Result<Option<Publisher>> {
        self.publisher_repo().get(id).await
    }

    pub async fn find_publisher_by_name(&self, name: &str) -> Result<Option<RecordId>> {
        self.publisher_repo().find_by_name(name).await
    }

    pub async fn add_publisher(&self, name: &str, country: &str) -> Result<RecordId> {
        self.publisher_repo().add(name, country).await
    }

    pub async fn update_publisher(&self, id: &RecordId, name: &str, country: &str) -> Result<bool> {
        self.publisher_repo().update(id, name, country).await
    }

    pub async fn remove_publisher(&self, id: &RecordId) -> Result<bool> {
        self.publisher_repo().remove(id).await
    }

    pub async fn publisher_count(&self) -> Result<u64> {
        self.publisher_repo().count().await
    }

    // Genres

    pub async fn list_genres(&self) -> Result<Vec<Genre>> {
        self.genre_repo().list().await
    }

    pub async fn get_genre(&self, id: &RecordId) -> Result<Option<Genre>> {
        self.genre_repo().get(id).await
    }

    pub async fn find_genre_by_name(&self, name: &str) -> Result<Option<RecordId>> {
        self.genre_repo().find_by_name(name).await
    }

    pub async fn existing_genre_ids(&self, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        self.genre_repo().existing_ids(ids).await
    }

    pub async fn add_genre(&self, name: &str) -> Result<RecordId> {
        self.genre_repo().add(name).await
    }

    pub async fn update_genre(&self, id: &RecordId, name: &str) -> Result<bool> {
        self.genre_repo().update(id, name).await
    }

    pub async fn remove_genre(&self, id: &RecordId) -> Result<bool> {
        self.genre_repo().remove(id).await
    }

    pub async fn genre_count(&self) -> Result<u64> {
        self.genre_repo().count().await
    }

    // Platforms

    pub async fn list_platforms(&self) -> Result<Vec<Platform>> {
        self.platform_repo().list().await
    }

    pub async fn get_platform(&self, id: &RecordId) -> Result<Option<Platform>> {
        self.platform_repo().get(id).await
    }

    pub async fn find_platform_by_name(&self, name: &str) -> Result<Option<RecordId>> {
        self.platform_repo().find_by_name(name).await
    }

    pub async fn existing_platform_ids(&self, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        self.platform_repo().existing_ids(ids).await
    }

    pub async fn add_platform(&self, name: &str) -> Result<RecordId> {
        self.platform_repo().add(name).await
    }

    pub async fn update_platform(&self, id: &RecordId, name: &str) -> Result<bool> {
        self.platform_repo().update(id, name).await
    }

    pub async fn remove_platform(&self, id: &RecordId) -> Result<bool> {
        self.platform_repo().remove(id).await
    }

    pub async fn platform_count(&self) -> Result<u64> {
        self.platform_repo().count().await
    }
}

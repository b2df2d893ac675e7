pub use super::game_genres::Entity as GameGenres;
pub use super::game_platforms::Entity as GamePlatforms;
pub use super::games::Entity as Games;
pub use super::genres::Entity as Genres;
pub use super::platforms::Entity as Platforms;
pub use super::publishers::Entity as Publishers;

pub mod catalog;
pub mod game;

pub use catalog::{GameLink, Genre, Platform, Publisher};
pub use game::{Game, GameInput, GameSummary, PublisherRef};

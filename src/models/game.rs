use serde::Serialize;

use super::{Genre, Platform, Publisher};
use crate::domain::RecordId;
use crate::entities::{games, publishers};

#[derive(Debug, Clone, Serialize)]
pub struct PublisherRef {
    pub id: RecordId,
    pub name: String,
    pub url: String,
}

impl From<publishers::Model> for PublisherRef {
    fn from(model: publishers::Model) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/publisher/{id}"),
            id,
            name: model.name,
        }
    }
}

/// Row of the game list.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub id: RecordId,
    pub title: String,
    pub year: i32,
    pub url: String,
    pub publisher: Option<PublisherRef>,
}

impl GameSummary {
    #[must_use]
    pub fn new(model: games::Model, publisher: Option<publishers::Model>) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/game/{id}"),
            id,
            title: model.title,
            year: model.year,
            publisher: publisher.map(PublisherRef::from),
        }
    }
}

/// A game with every reference resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Game {
    pub id: RecordId,
    pub title: String,
    pub summary: String,
    pub year: i32,
    pub price: f64,
    pub number_in_stock: String,
    pub img_src: Option<String>,
    pub img_url: Option<String>,
    pub url: String,
    pub publisher: Option<Publisher>,
    pub genres: Vec<Genre>,
    pub platforms: Vec<Platform>,
}

impl Game {
    #[must_use]
    pub fn new(
        model: games::Model,
        publisher: Option<Publisher>,
        genres: Vec<Genre>,
        platforms: Vec<Platform>,
    ) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/game/{id}"),
            img_url: model.img_src.as_ref().map(|src| format!("/images/{src}")),
            id,
            title: model.title,
            summary: model.summary,
            year: model.year,
            price: model.price,
            number_in_stock: model.number_in_stock,
            img_src: model.img_src,
            publisher,
            genres,
            platforms,
        }
    }
}

/// Validated game fields, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInput {
    pub title: String,
    pub publisher_id: RecordId,
    pub summary: String,
    pub year: i32,
    pub price: f64,
    pub number_in_stock: String,
    pub genre_ids: Vec<RecordId>,
    pub platform_ids: Vec<RecordId>,
}

use serde::Serialize;

use crate::domain::RecordId;
use crate::entities::{games, genres, platforms, publishers};

#[derive(Debug, Clone, Serialize)]
pub struct Publisher {
    pub id: RecordId,
    pub name: String,
    pub country: String,
    pub url: String,
}

impl From<publishers::Model> for Publisher {
    fn from(model: publishers::Model) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/publisher/{id}"),
            id,
            name: model.name,
            country: model.country,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Genre {
    pub id: RecordId,
    pub name: String,
    pub url: String,
}

impl From<genres::Model> for Genre {
    fn from(model: genres::Model) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/genre/{id}"),
            id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Platform {
    pub id: RecordId,
    pub name: String,
    pub url: String,
}

impl From<platforms::Model> for Platform {
    fn from(model: platforms::Model) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/platform/{id}"),
            id,
            name: model.name,
        }
    }
}

/// A game listed as a dependent of a publisher, genre or platform.
#[derive(Debug, Clone, Serialize)]
pub struct GameLink {
    pub id: RecordId,
    pub title: String,
    pub year: i32,
    pub url: String,
}

impl From<games::Model> for GameLink {
    fn from(model: games::Model) -> Self {
        let id = RecordId::from_stored(model.id);
        Self {
            url: format!("/game/{id}"),
            id,
            title: model.title,
            year: model.year,
        }
    }
}

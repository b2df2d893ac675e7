use anyhow::Result;
use chrono::Datelike;
use serde::Serialize;
use tera::Context;

use super::{Choice, Previous, Resource, Submission};
use crate::db::Store;
use crate::domain::{RecordId, parse_ids};
use crate::forms::{Field, FieldErrors, SubmittedForm};
use crate::models::GameInput;

pub const EARLIEST_YEAR: i32 = 1990;

/// Game form state. Numbers stay as typed so a rejected form shows them
/// back unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameDraft {
    pub title: String,
    pub publisher: String,
    pub summary: String,
    pub year: String,
    pub price: String,
    pub numberstock: String,
    pub genre: Vec<String>,
    pub platform: Vec<String>,
    pub img_url: Option<String>,
}

pub struct GameResource;

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[async_trait::async_trait]
impl Resource for GameResource {
    type Draft = GameDraft;
    type Input = GameInput;

    const SLUG: &'static str = "game";
    const LABEL: &'static str = "Game";
    const PLURAL: &'static str = "Games";
    const KEY_FIELD: &'static str = "title";
    const DUPLICATE_MESSAGE: &'static str = "A game with this title and year already exists";
    const ACCEPTS_IMAGE: bool = true;

    async fn list(store: &Store, ctx: &mut Context) -> Result<()> {
        ctx.insert("games", &store.list_games().await?);
        Ok(())
    }

    async fn detail(store: &Store, id: &RecordId, ctx: &mut Context) -> Result<bool> {
        let Some(game) = store.get_game(id).await? else {
            return Ok(false);
        };

        ctx.insert("title", &game.title);
        ctx.insert("game", &game);
        Ok(true)
    }

    async fn form_options(store: &Store, draft: &GameDraft, ctx: &mut Context) -> Result<()> {
        let (publishers, genres, platforms) = futures::try_join!(
            store.list_publishers(),
            store.list_genres(),
            store.list_platforms()
        )?;

        let selected_publisher = [draft.publisher.clone()];
        ctx.insert(
            "publishers",
            &Choice::marked(
                publishers.iter().map(|p| (&p.id, p.name.as_str())),
                &selected_publisher,
            ),
        );
        ctx.insert(
            "genres",
            &Choice::marked(genres.iter().map(|g| (&g.id, g.name.as_str())), &draft.genre),
        );
        ctx.insert(
            "platforms",
            &Choice::marked(
                platforms.iter().map(|p| (&p.id, p.name.as_str())),
                &draft.platform,
            ),
        );
        ctx.insert("earliest_year", &EARLIEST_YEAR);
        ctx.insert("latest_year", &current_year());
        Ok(())
    }

    async fn load_draft(store: &Store, id: &RecordId) -> Result<Option<GameDraft>> {
        let Some(stored) = store.get_stored_game(id).await? else {
            return Ok(None);
        };
        let game = stored.model;

        Ok(Some(GameDraft {
            img_url: game.img_src.as_ref().map(|src| format!("/images/{src}")),
            title: game.title,
            publisher: game.publisher_id.unwrap_or_default(),
            summary: game.summary,
            year: game.year.to_string(),
            price: game.price.to_string(),
            numberstock: game.number_in_stock,
            genre: stored.genre_ids.iter().map(ToString::to_string).collect(),
            platform: stored.platform_ids.iter().map(ToString::to_string).collect(),
        }))
    }

    fn keep_stored(submitted: &mut GameDraft, stored: GameDraft) {
        submitted.img_url = stored.img_url;
    }

    async fn validate(
        store: &Store,
        form: &SubmittedForm,
    ) -> Result<Submission<GameDraft, GameInput>> {
        let mut errors = FieldErrors::new();
        let latest_year = current_year();

        let title = Field::new("title", form.text("title"))
            .trimmed()
            .lowercased()
            .min_chars(3, "Title must be at least 3 characters")
            .max_chars(200, "Title must be at most 200 characters")
            .finish(&mut errors);

        let publisher = Field::new("publisher", form.text("publisher"))
            .trimmed()
            .non_empty("Publisher must be selected")
            .finish(&mut errors);
        let mut publisher_id = None;
        if !errors.contains("publisher") {
            let known = match publisher.parse::<RecordId>() {
                Ok(id) => store.get_publisher(&id).await?.map(|_| id),
                Err(_) => None,
            };
            if known.is_none() {
                errors.add("publisher", "Selected publisher does not exist");
            }
            publisher_id = known;
        }

        let summary = Field::new("summary", form.text("summary"))
            .trimmed()
            .non_empty("Summary must not be empty")
            .finish(&mut errors);

        let (year_raw, year) = Field::new("year", form.text("year"))
            .trimmed()
            .non_empty("Year must not be empty")
            .finish_integer(
                EARLIEST_YEAR..=latest_year,
                &format!("Year must be between {EARLIEST_YEAR} and {latest_year}"),
                &mut errors,
            );

        let (price_raw, price) = Field::new("price", form.text("price"))
            .trimmed()
            .non_empty("Price must not be empty")
            .finish_number(1.0, "Price must be a number of at least 1", &mut errors);

        let number_in_stock = Field::new("numberstock", form.text("numberstock"))
            .trimmed()
            .non_empty("Number in stock must not be empty")
            .finish(&mut errors);

        let genre_ids = parse_ids(&form.values("genre"));
        if store.existing_genre_ids(&genre_ids).await?.len() != genre_ids.len() {
            errors.add("genre", "Selected genre does not exist");
        }
        let platform_ids = parse_ids(&form.values("platform"));
        if store.existing_platform_ids(&platform_ids).await?.len() != platform_ids.len() {
            errors.add("platform", "Selected platform does not exist");
        }

        let draft = GameDraft {
            title: title.clone(),
            publisher,
            summary: summary.clone(),
            year: year_raw,
            price: price_raw,
            numberstock: number_in_stock.clone(),
            genre: genre_ids.iter().map(ToString::to_string).collect(),
            platform: platform_ids.iter().map(ToString::to_string).collect(),
            img_url: None,
        };

        let input = match (publisher_id, year, price) {
            (Some(publisher_id), Some(year), Some(price)) => Some(GameInput {
                title,
                publisher_id,
                summary,
                year,
                price,
                number_in_stock,
                genre_ids,
                platform_ids,
            }),
            _ => None,
        };

        Ok(Submission::new(draft, errors, input))
    }

    async fn find_duplicate(store: &Store, input: &GameInput) -> Result<Option<RecordId>> {
        store.find_game_by_title_year(&input.title, input.year).await
    }

    async fn insert(store: &Store, input: &GameInput, img_src: Option<String>) -> Result<RecordId> {
        store.add_game(input, img_src).await
    }

    async fn update(
        store: &Store,
        id: &RecordId,
        input: &GameInput,
        img_src: Option<String>,
    ) -> Result<Option<Previous>> {
        let previous = store.update_game(id, input, img_src).await?;
        Ok(previous.map(|row| Previous { img_src: row.img_src }))
    }

    async fn delete(store: &Store, id: &RecordId) -> Result<Option<Previous>> {
        let removed = store.remove_game(id).await?;
        Ok(removed.map(|row| Previous { img_src: row.img_src }))
    }
}

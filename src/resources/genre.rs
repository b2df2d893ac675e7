use anyhow::Result;
use tera::Context;

use super::{NameDraft, Previous, Resource, Submission, validate_name};
use crate::db::Store;
use crate::domain::RecordId;
use crate::forms::SubmittedForm;

pub struct GenreResource;

#[async_trait::async_trait]
impl Resource for GenreResource {
    type Draft = NameDraft;
    type Input = String;

    const SLUG: &'static str = "genre";
    const LABEL: &'static str = "Genre";
    const PLURAL: &'static str = "Genres";
    const KEY_FIELD: &'static str = "name";
    const DUPLICATE_MESSAGE: &'static str = "A genre with this name already exists";

    async fn list(store: &Store, ctx: &mut Context) -> Result<()> {
        ctx.insert("genres", &store.list_genres().await?);
        Ok(())
    }

    async fn detail(store: &Store, id: &RecordId, ctx: &mut Context) -> Result<bool> {
        let (genre, games) = futures::try_join!(store.get_genre(id), store.games_by_genre(id))?;
        let Some(genre) = genre else {
            return Ok(false);
        };

        ctx.insert("title", &genre.name);
        ctx.insert("genre", &genre);
        ctx.insert("games", &games);
        Ok(true)
    }

    async fn load_draft(store: &Store, id: &RecordId) -> Result<Option<NameDraft>> {
        Ok(store
            .get_genre(id)
            .await?
            .map(|genre| NameDraft { name: genre.name }))
    }

    async fn validate(_store: &Store, form: &SubmittedForm) -> Result<Submission<NameDraft, String>> {
        Ok(validate_name(form, 3, "Genre name must be at least 3 characters"))
    }

    async fn find_duplicate(store: &Store, name: &String) -> Result<Option<RecordId>> {
        store.find_genre_by_name(name).await
    }

    async fn insert(store: &Store, name: &String, _img_src: Option<String>) -> Result<RecordId> {
        store.add_genre(name).await
    }

    async fn update(
        store: &Store,
        id: &RecordId,
        name: &String,
        _img_src: Option<String>,
    ) -> Result<Option<Previous>> {
        Ok(store
            .update_genre(id, name)
            .await?
            .then(Previous::default))
    }

    async fn delete(store: &Store, id: &RecordId) -> Result<Option<Previous>> {
        Ok(store.remove_genre(id).await?.then(Previous::default))
    }
}

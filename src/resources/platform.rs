use anyhow::Result;
use tera::Context;

use super::{NameDraft, Previous, Resource, Submission, validate_name};
use crate::db::Store;
use crate::domain::RecordId;
use crate::forms::SubmittedForm;

pub struct PlatformResource;

#[async_trait::async_trait]
impl Resource for PlatformResource {
    type Draft = NameDraft;
    type Input = String;

    const SLUG: &'static str = "platform";
    const LABEL: &'static str = "Platform";
    const PLURAL: &'static str = "Platforms";
    const KEY_FIELD: &'static str = "name";
    const DUPLICATE_MESSAGE: &'static str = "A platform with this name already exists";

    async fn list(store: &Store, ctx: &mut Context) -> Result<()> {
        ctx.insert("platforms", &store.list_platforms().await?);
        Ok(())
    }

    async fn detail(store: &Store, id: &RecordId, ctx: &mut Context) -> Result<bool> {
        let (platform, games) =
            futures::try_join!(store.get_platform(id), store.games_by_platform(id))?;
        let Some(platform) = platform else {
            return Ok(false);
        };

        ctx.insert("title", &platform.name);
        ctx.insert("platform", &platform);
        ctx.insert("games", &games);
        Ok(true)
    }

    async fn load_draft(store: &Store, id: &RecordId) -> Result<Option<NameDraft>> {
        let platform = store.get_platform(id).await?;
        Ok(platform.map(|p| NameDraft { name: p.name }))
    }

    // "pc" is a real platform, hence the shorter minimum.
    async fn validate(_store: &Store, form: &SubmittedForm) -> Result<Submission<NameDraft, String>> {
        Ok(validate_name(form, 2, "Platform name must be at least 2 characters"))
    }

    async fn find_duplicate(store: &Store, name: &String) -> Result<Option<RecordId>> {
        store.find_platform_by_name(name).await
    }

    async fn insert(store: &Store, name: &String, _img_src: Option<String>) -> Result<RecordId> {
        store.add_platform(name).await
    }

    async fn update(
        store: &Store,
        id: &RecordId,
        name: &String,
        _img_src: Option<String>,
    ) -> Result<Option<Previous>> {
        let updated = store.update_platform(id, name).await?;
        Ok(updated.then(Previous::default))
    }

    async fn delete(store: &Store, id: &RecordId) -> Result<Option<Previous>> {
        let removed = store.remove_platform(id).await?;
        Ok(removed.then(Previous::default))
    }
}

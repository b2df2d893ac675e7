use anyhow::Result;
use serde::Serialize;
use tera::Context;

use super::{Previous, Resource, Submission};
use crate::db::Store;
use crate::domain::RecordId;
use crate::forms::{Field, FieldErrors, SubmittedForm};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublisherDraft {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherInput {
    pub name: String,
    pub country: String,
}

pub struct PublisherResource;

#[async_trait::async_trait]
impl Resource for PublisherResource {
    type Draft = PublisherDraft;
    type Input = PublisherInput;

    const SLUG: &'static str = "publisher";
    const LABEL: &'static str = "Publisher";
    const PLURAL: &'static str = "Publishers";
    const KEY_FIELD: &'static str = "name";
    const DUPLICATE_MESSAGE: &'static str = "A publisher with this name already exists";

    async fn list(store: &Store, ctx: &mut Context) -> Result<()> {
        ctx.insert("publishers", &store.list_publishers().await?);
        Ok(())
    }

    async fn detail(store: &Store, id: &RecordId, ctx: &mut Context) -> Result<bool> {
        let (publisher, games) =
            futures::try_join!(store.get_publisher(id), store.games_by_publisher(id))?;
        let Some(publisher) = publisher else {
            return Ok(false);
        };

        ctx.insert("title", &publisher.name);
        ctx.insert("publisher", &publisher);
        ctx.insert("games", &games);
        Ok(true)
    }

    async fn load_draft(store: &Store, id: &RecordId) -> Result<Option<PublisherDraft>> {
        Ok(store.get_publisher(id).await?.map(|p| PublisherDraft {
            name: p.name,
            country: p.country,
        }))
    }

    async fn validate(
        _store: &Store,
        form: &SubmittedForm,
    ) -> Result<Submission<PublisherDraft, PublisherInput>> {
        let mut errors = FieldErrors::new();

        // Case is kept: publishers are proper names.
        let name = Field::new("name", form.text("name"))
            .trimmed()
            .min_chars(3, "Publisher name must be at least 3 characters")
            .max_chars(100, "Publisher name must be at most 100 characters")
            .finish(&mut errors);
        let country = Field::new("country", form.text("country"))
            .trimmed()
            .min_chars(3, "Country must be at least 3 characters")
            .max_chars(100, "Country must be at most 100 characters")
            .finish(&mut errors);

        let input = PublisherInput {
            name: name.clone(),
            country: country.clone(),
        };
        Ok(Submission::new(
            PublisherDraft { name, country },
            errors,
            Some(input),
        ))
    }

    async fn find_duplicate(store: &Store, input: &PublisherInput) -> Result<Option<RecordId>> {
        store.find_publisher_by_name(&input.name).await
    }

    async fn insert(
        store: &Store,
        input: &PublisherInput,
        _img_src: Option<String>,
    ) -> Result<RecordId> {
        store.add_publisher(&input.name, &input.country).await
    }

    async fn update(
        store: &Store,
        id: &RecordId,
        input: &PublisherInput,
        _img_src: Option<String>,
    ) -> Result<Option<Previous>> {
        let updated = store
            .update_publisher(id, &input.name, &input.country)
            .await?;
        Ok(updated.then(Previous::default))
    }

    async fn delete(store: &Store, id: &RecordId) -> Result<Option<Previous>> {
        Ok(store.remove_publisher(id).await?.then(Previous::default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (Store, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("publisher-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}", path.display())).await.unwrap();
        (store, path)
    }

    #[tokio::test]
    async fn test_validate_keeps_case_and_reports_both_fields() {
        let (store, path) = store().await;

        let form = SubmittedForm::from_pairs([("name", "  Nintendo "), ("country", "Japan")]);
        let submission = PublisherResource::validate(&store, &form).await.unwrap();
        assert_eq!(submission.draft.name, "Nintendo");
        assert_eq!(submission.outcome.unwrap().country, "Japan");

        let form = SubmittedForm::from_pairs([("name", "EA"), ("country", "US")]);
        let errors = PublisherResource::validate(&store, &form)
            .await
            .unwrap()
            .outcome
            .unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("country"));

        let _ = std::fs::remove_file(path);
    }
}

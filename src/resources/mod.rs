//! The four inventory resources behind one CRUD contract.
//!
//! Each resource describes how to list, show, validate, and write its
//! records; `api::crud` drives every resource through the same request
//! lifecycle.

pub mod game;
pub mod genre;
pub mod platform;
pub mod publisher;

pub use game::GameResource;
pub use genre::GenreResource;
pub use platform::PlatformResource;
pub use publisher::PublisherResource;

use anyhow::Result;
use serde::Serialize;
use tera::Context;

use crate::db::Store;
use crate::domain::RecordId;
use crate::forms::{Field, FieldErrors, SubmittedForm};

#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CrudError {
    #[must_use]
    pub const fn not_found<R: Resource>() -> Self {
        Self::NotFound(R::LABEL)
    }
}

/// A path segment that is not a well-formed id names no record.
pub fn parse_record_id<R: Resource>(raw: &str) -> std::result::Result<RecordId, CrudError> {
    raw.parse().map_err(|_| CrudError::not_found::<R>())
}

/// Normalized form values plus either validated input or field errors.
#[derive(Debug)]
pub struct Submission<D, I> {
    pub draft: D,
    pub outcome: std::result::Result<I, FieldErrors>,
}

impl<D, I> Submission<D, I> {
    /// `input` is used only when no field failed.
    pub fn new(draft: D, errors: FieldErrors, input: Option<I>) -> Self {
        let outcome = match input {
            Some(input) if errors.is_empty() => Ok(input),
            _ => Err(errors),
        };
        Self { draft, outcome }
    }

    /// Fails the submission on `field`, keeping any earlier errors.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        match &mut self.outcome {
            Ok(_) => self.outcome = Err(FieldErrors::single(field, message)),
            Err(errors) => errors.add(field, message),
        }
    }

}

/// A record's state before it was overwritten or deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Previous {
    pub img_src: Option<String>,
}

#[async_trait::async_trait]
pub trait Resource: Send + Sync + 'static {
    /// What the form shows: normalized but possibly invalid values.
    type Draft: Serialize + Default + Send + Sync;

    type Input: Send + Sync;

    /// URL prefix and template directory.
    const SLUG: &'static str;
    const LABEL: &'static str;
    const PLURAL: &'static str;

    /// Field that carries the natural-key collision message.
    const KEY_FIELD: &'static str;
    const DUPLICATE_MESSAGE: &'static str;

    const ACCEPTS_IMAGE: bool = false;

    /// Inserts the sorted collection for the list view.
    async fn list(store: &Store, ctx: &mut Context) -> Result<()>;

    /// Inserts the record and its resolved references. `false` if missing.
    async fn detail(store: &Store, id: &RecordId, ctx: &mut Context) -> Result<bool>;

    /// Inserts the record and its dependents for the delete confirmation.
    async fn delete_context(store: &Store, id: &RecordId, ctx: &mut Context) -> Result<bool> {
        Self::detail(store, id, ctx).await
    }

    /// Inserts reference choices for the form, marking those in `draft`.
    async fn form_options(_store: &Store, _draft: &Self::Draft, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// The stored record as a pre-filled draft.
    async fn load_draft(store: &Store, id: &RecordId) -> Result<Option<Self::Draft>>;

    /// Copies what a submission cannot carry (such as the current image)
    /// from the stored draft into a resubmitted one.
    fn keep_stored(_submitted: &mut Self::Draft, _stored: Self::Draft) {}

    async fn validate(store: &Store, form: &SubmittedForm)
    -> Result<Submission<Self::Draft, Self::Input>>;

    /// Id of a stored record with the same natural key.
    async fn find_duplicate(store: &Store, input: &Self::Input) -> Result<Option<RecordId>>;

    async fn insert(store: &Store, input: &Self::Input, img_src: Option<String>)
    -> Result<RecordId>;

    /// `None` if the record does not exist.
    async fn update(
        store: &Store,
        id: &RecordId,
        input: &Self::Input,
        img_src: Option<String>,
    ) -> Result<Option<Previous>>;

    /// `None` if the record does not exist.
    async fn delete(store: &Store, id: &RecordId) -> Result<Option<Previous>>;

    #[must_use]
    fn list_url() -> String {
        format!("/{}/all", Self::SLUG)
    }

    #[must_use]
    fn record_url(id: &RecordId) -> String {
        format!("/{}/{id}", Self::SLUG)
    }

    #[must_use]
    fn template(view: &str) -> String {
        format!("{}/{view}.html", Self::SLUG)
    }
}

/// Form state shared by the single-field resources.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NameDraft {
    pub name: String,
}

pub(crate) fn validate_name(
    form: &SubmittedForm,
    min_chars: usize,
    message: &str,
) -> Submission<NameDraft, String> {
    let mut errors = FieldErrors::new();
    let name = Field::new("name", form.text("name"))
        .trimmed()
        .lowercased()
        .min_chars(min_chars, message)
        .max_chars(100, "Name must be at most 100 characters")
        .finish(&mut errors);

    Submission::new(NameDraft { name: name.clone() }, errors, Some(name))
}

/// A reference option on a form.
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub id: String,
    pub name: String,
    pub checked: bool,
}

impl Choice {
    pub fn marked<'a>(
        options: impl IntoIterator<Item = (&'a RecordId, &'a str)>,
        selected: &[String],
    ) -> Vec<Self> {
        options
            .into_iter()
            .map(|(id, name)| Self {
                checked: selected.iter().any(|s| s == id.as_str()),
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_reject_turns_valid_into_invalid() {
        let mut submission = Submission::new((), FieldErrors::new(), Some(1));
        assert!(submission.outcome.is_ok());

        submission.reject("password", "Incorrect password");
        submission.reject("name", "taken");

        let errors = submission.outcome.unwrap_err();
        assert_eq!(errors.get("password"), Some("Incorrect password"));
        assert_eq!(errors.get("name"), Some("taken"));
    }

    #[test]
    fn test_validate_name_lowercases_and_trims() {
        let form = SubmittedForm::from_pairs([("name", "  Action ")]);
        let submission = validate_name(&form, 3, "too short");
        assert_eq!(submission.draft.name, "action");
        assert_eq!(submission.outcome.unwrap(), "action");
    }

    #[test]
    fn test_validate_name_reports_only_name() {
        let form = SubmittedForm::from_pairs([("name", "ab")]);
        let submission = validate_name(&form, 3, "too short");
        let errors = submission.outcome.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("too short"));
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        let err = parse_record_id::<GenreResource>("not-an-id").unwrap_err();
        assert!(matches!(err, CrudError::NotFound("Genre")));
        assert_eq!(err.to_string(), "Genre not found");
        assert!(parse_record_id::<GenreResource>("000000000000000000000000").is_ok());
    }

    #[test]
    fn test_choices_mark_selected() {
        let a: RecordId = "65f0c0ffee0000000000000a".parse().unwrap();
        let b: RecordId = "65f0c0ffee0000000000000b".parse().unwrap();
        let choices = Choice::marked(
            [(&a, "action"), (&b, "puzzle")],
            &[b.to_string()],
        );
        assert!(!choices[0].checked);
        assert!(choices[1].checked);
    }
}

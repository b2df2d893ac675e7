//! One request lifecycle driven four times, once per [`Resource`].

use axum::{
    Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{debug, info};

use super::{AppError, AppState};
use crate::domain::RecordId;
use crate::forms::{FieldErrors, SubmittedForm};
use crate::resources::{CrudError, Resource, Submission, parse_record_id};
use crate::services::UploadRejection;

pub fn routes<R: Resource>() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index::<R>))
        .route("/all", get(list::<R>))
        .route("/create", get(create_form::<R>).post(create::<R>))
        .route("/{id}", get(detail::<R>))
        .route("/{id}/update", get(update_form::<R>).post(update::<R>))
        .route("/{id}/delete", get(delete_form::<R>).post(delete::<R>))
}

/// An image checked and written before the rest of the form is validated.
enum StagedImage {
    Absent,
    Saved(String),
    Rejected(UploadRejection),
}

impl StagedImage {
    fn filename(&self) -> Option<String> {
        match self {
            Self::Saved(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn apply<D, I>(&self, submission: &mut Submission<D, I>) {
        if let Self::Rejected(rejection) = self {
            submission.reject(SubmittedForm::UPLOAD_FIELD, rejection.to_string());
        }
    }
}

/// Whether the staged image ended up referenced by a stored record.
enum Written {
    Kept(Response),
    Discarded(Response),
}

async fn stage_image<R: Resource>(
    state: &AppState,
    form: &mut SubmittedForm,
) -> Result<StagedImage, AppError> {
    let Some(upload) = form.take_upload() else {
        return Ok(StagedImage::Absent);
    };
    if !R::ACCEPTS_IMAGE {
        debug!(resource = R::SLUG, "Ignoring upload on a resource without images");
        return Ok(StagedImage::Absent);
    }
    if let Err(rejection) = state.images.check(&upload) {
        return Ok(StagedImage::Rejected(rejection));
    }
    Ok(StagedImage::Saved(state.images.save(&upload).await?))
}

async fn discard(state: &AppState, staged: &StagedImage) {
    if let Some(filename) = staged.filename() {
        state.images.remove(&filename).await;
    }
}

async fn finish(
    state: &AppState,
    staged: &StagedImage,
    written: Result<Written, AppError>,
) -> Result<Response, AppError> {
    match written {
        Ok(Written::Kept(response)) => Ok(response),
        Ok(Written::Discarded(response)) => {
            discard(state, staged).await;
            Ok(response)
        }
        Err(err) => {
            discard(state, staged).await;
            Err(err)
        }
    }
}

async fn check_gate<D, I>(
    state: &AppState,
    session: &Session,
    form: &SubmittedForm,
    submission: &mut Submission<D, I>,
) -> Result<(), AppError> {
    let password = form.value("password").filter(|p| !p.is_empty());
    if state.gate.authorize(session, password).await? {
        return Ok(());
    }
    submission.reject(
        "password",
        if password.is_some() {
            "Incorrect password"
        } else {
            "Admin password is required"
        },
    );
    Ok(())
}

fn redirect_to(url: &str) -> Response {
    Redirect::to(url).into_response()
}

async fn render_form<R: Resource>(
    state: &AppState,
    session: &Session,
    id: Option<&RecordId>,
    draft: &R::Draft,
    errors: &FieldErrors,
) -> Result<Html<String>, AppError> {
    let (title, action) = match id {
        Some(id) => (
            format!("Update {}", R::LABEL),
            format!("{}/update", R::record_url(id)),
        ),
        None => (
            format!("Create {}", R::LABEL),
            format!("/{}/create", R::SLUG),
        ),
    };

    let mut ctx = state.page(session, &title).await;
    ctx.insert("action", &action);
    ctx.insert("is_update", &id.is_some());
    ctx.insert("draft", draft);
    ctx.insert("errors", errors);
    R::form_options(&state.store, draft, &mut ctx)
        .await
        .map_err(CrudError::from)?;

    state.render(&R::template("form"), &ctx)
}

pub async fn index<R: Resource>() -> Redirect {
    Redirect::to(&R::list_url())
}

pub async fn list<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let mut ctx = state.page(&session, R::PLURAL).await;
    R::list(&state.store, &mut ctx)
        .await
        .map_err(CrudError::from)?;
    state.render(&R::template("list"), &ctx)
}

pub async fn detail<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let id = parse_record_id::<R>(&raw_id)?;

    let mut ctx = state.page(&session, R::LABEL).await;
    if !R::detail(&state.store, &id, &mut ctx)
        .await
        .map_err(CrudError::from)?
    {
        return Err(CrudError::not_found::<R>().into());
    }

    state.render(&R::template("detail"), &ctx)
}

pub async fn create_form<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let draft = <R::Draft as Default>::default();
    render_form::<R>(&state, &session, None, &draft, &FieldErrors::new()).await
}

pub async fn create<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut form: SubmittedForm,
) -> Result<Response, AppError> {
    let staged = stage_image::<R>(&state, &mut form).await?;
    let written = write_new::<R>(&state, &session, &form, &staged).await;
    finish(&state, &staged, written).await
}

async fn write_new<R: Resource>(
    state: &AppState,
    session: &Session,
    form: &SubmittedForm,
    staged: &StagedImage,
) -> Result<Written, AppError> {
    let mut submission = R::validate(&state.store, form)
        .await
        .map_err(CrudError::from)?;
    staged.apply(&mut submission);
    check_gate(state, session, form, &mut submission).await?;

    let input = match submission.outcome {
        Ok(input) => input,
        Err(errors) => {
            let page = render_form::<R>(state, session, None, &submission.draft, &errors).await?;
            return Ok(Written::Discarded(page.into_response()));
        }
    };

    if let Some(existing) = R::find_duplicate(&state.store, &input)
        .await
        .map_err(CrudError::from)?
    {
        info!(resource = R::SLUG, id = %existing, "Submission matches an existing record");
        return Ok(Written::Discarded(redirect_to(&R::record_url(&existing))));
    }

    let id = R::insert(&state.store, &input, staged.filename())
        .await
        .map_err(CrudError::from)?;
    metrics::counter!("store_records_created_total", "resource" => R::SLUG).increment(1);

    Ok(Written::Kept(redirect_to(&R::record_url(&id))))
}

pub async fn update_form<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let id = parse_record_id::<R>(&raw_id)?;
    let Some(draft) = R::load_draft(&state.store, &id)
        .await
        .map_err(CrudError::from)?
    else {
        return Err(CrudError::not_found::<R>().into());
    };

    render_form::<R>(&state, &session, Some(&id), &draft, &FieldErrors::new()).await
}

pub async fn update<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    session: Session,
    mut form: SubmittedForm,
) -> Result<Response, AppError> {
    let id = parse_record_id::<R>(&raw_id)?;
    let staged = stage_image::<R>(&state, &mut form).await?;
    let written = overwrite::<R>(&state, &session, &id, &form, &staged).await;
    finish(&state, &staged, written).await
}

async fn overwrite<R: Resource>(
    state: &AppState,
    session: &Session,
    id: &RecordId,
    form: &SubmittedForm,
    staged: &StagedImage,
) -> Result<Written, AppError> {
    let Some(stored) = R::load_draft(&state.store, id)
        .await
        .map_err(CrudError::from)?
    else {
        return Err(CrudError::not_found::<R>().into());
    };

    let mut submission = R::validate(&state.store, form)
        .await
        .map_err(CrudError::from)?;
    R::keep_stored(&mut submission.draft, stored);
    staged.apply(&mut submission);
    check_gate(state, session, form, &mut submission).await?;

    let duplicate = match &submission.outcome {
        Ok(input) => R::find_duplicate(&state.store, input)
            .await
            .map_err(CrudError::from)?,
        Err(_) => None,
    };
    if duplicate.is_some_and(|other| other != *id) {
        submission.reject(R::KEY_FIELD, R::DUPLICATE_MESSAGE);
    }

    let input = match submission.outcome {
        Ok(input) => input,
        Err(errors) => {
            let page =
                render_form::<R>(state, session, Some(id), &submission.draft, &errors).await?;
            return Ok(Written::Discarded(page.into_response()));
        }
    };

    let new_image = staged.filename();
    let Some(previous) = R::update(&state.store, id, &input, new_image.clone())
        .await
        .map_err(CrudError::from)?
    else {
        return Err(CrudError::not_found::<R>().into());
    };

    if let (Some(new), Some(old)) = (new_image.as_deref(), previous.img_src.as_deref())
        && new != old
    {
        state.images.remove(old).await;
    }

    Ok(Written::Kept(redirect_to(&R::record_url(id))))
}

async fn render_delete<R: Resource>(
    state: &AppState,
    session: &Session,
    id: &RecordId,
    errors: &FieldErrors,
) -> Result<Option<Html<String>>, AppError> {
    let title = format!("Delete {}", R::LABEL);
    let mut ctx = state.page(session, &title).await;
    if !R::delete_context(&state.store, id, &mut ctx)
        .await
        .map_err(CrudError::from)?
    {
        return Ok(None);
    }
    // The record context names the page after the record itself.
    ctx.insert("title", &title);
    ctx.insert("errors", errors);

    state.render(&R::template("delete"), &ctx).map(Some)
}

pub async fn delete_form<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    session: Session,
) -> Result<Response, AppError> {
    let Ok(id) = parse_record_id::<R>(&raw_id) else {
        return Ok(redirect_to(&R::list_url()));
    };

    Ok(
        match render_delete::<R>(&state, &session, &id, &FieldErrors::new()).await? {
            Some(page) => page.into_response(),
            None => redirect_to(&R::list_url()),
        },
    )
}

pub async fn delete<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    session: Session,
    form: SubmittedForm,
) -> Result<Response, AppError> {
    let Ok(id) = parse_record_id::<R>(&raw_id) else {
        return Ok(redirect_to(&R::list_url()));
    };

    let mut gate = Submission::new((), FieldErrors::new(), Some(()));
    check_gate(&state, &session, &form, &mut gate).await?;
    if let Err(errors) = gate.outcome {
        return Ok(
            match render_delete::<R>(&state, &session, &id, &errors).await? {
                Some(page) => page.into_response(),
                None => redirect_to(&R::list_url()),
            },
        );
    }

    if let Some(previous) = R::delete(&state.store, &id)
        .await
        .map_err(CrudError::from)?
    {
        if let Some(img_src) = previous.img_src {
            state.images.remove(&img_src).await;
        }
        info!(resource = R::SLUG, id = %id, "Record deleted");
        metrics::counter!("store_records_deleted_total", "resource" => R::SLUG).increment(1);
    }

    Ok(redirect_to(&R::list_url()))
}

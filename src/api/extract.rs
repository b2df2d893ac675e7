//! Decodes form bodies into [`SubmittedForm`] regardless of encoding.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
    http::header::CONTENT_TYPE,
};

use super::AppError;
use crate::forms::{SubmittedForm, Upload};

fn multipart_error(err: MultipartError) -> AppError {
    AppError::rejected(err.status(), err.body_text())
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA)
}

impl<S> FromRequest<S> for SubmittedForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            return Ok(Self::from_urlencoded(&body));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;

        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                // "No file chosen" arrives as an empty part with an empty name.
                if name == Self::UPLOAD_FIELD && !file_name.is_empty() && !data.is_empty() {
                    form.set_upload(Upload {
                        file_name,
                        content_type,
                        data,
                    });
                }
                continue;
            }

            let value = field.text().await.map_err(multipart_error)?;
            form.push(name, value);
        }

        Ok(form)
    }
}

//! Submitted form data, independent of how it was encoded on the wire.

pub mod validation;

pub use validation::{Field, FieldErrors};

use axum::body::Bytes;

/// A file part received with a form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Ordered name/value pairs plus at most one uploaded file.
#[derive(Debug, Clone, Default)]
pub struct SubmittedForm {
    fields: Vec<(String, String)>,
    upload: Option<Upload>,
}

impl SubmittedForm {
    pub const UPLOAD_FIELD: &'static str = "image";

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            upload: None,
        }
    }

    pub fn from_urlencoded(body: &[u8]) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(body).into_owned())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn set_upload(&mut self, upload: Upload) {
        self.upload = Some(upload);
    }

    /// First value posted under `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value posted under `name`, or `""`.
    #[must_use]
    pub fn text(&self, name: &str) -> &str {
        self.value(name).unwrap_or_default()
    }

    /// Every value posted under `name` or `name[]`, in submission order.
    ///
    /// A multi-valued control yields zero, one or many entries; callers
    /// always see a sequence.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name || k.strip_suffix("[]") == Some(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn take_upload(&mut self) -> Option<Upload> {
        self.upload.take()
    }
}

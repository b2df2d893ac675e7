//! Field rules applied to submitted form values.
//!
//! A [`Field`] carries one submitted value through normalization
//! (`trimmed`, `lowercased`) and rules (`non_empty`, `min_chars`, ...).
//! The first failing rule wins; `finish*` records it in [`FieldErrors`] and
//! hands back the normalized value so the form can show it again.

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Field name to message. One message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` unless the field already has one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    value: String,
    error: Option<String>,
}

impl Field {
    #[must_use]
    pub fn new(name: &'static str, raw: &str) -> Self {
        Self {
            name,
            value: raw.to_string(),
            error: None,
        }
    }

    #[must_use]
    pub fn trimmed(mut self) -> Self {
        let trimmed = self.value.trim();
        if trimmed.len() != self.value.len() {
            self.value = trimmed.to_string();
        }
        self
    }

    #[must_use]
    pub fn lowercased(mut self) -> Self {
        self.value = self.value.to_lowercase();
        self
    }

    #[must_use]
    pub fn non_empty(self, message: &str) -> Self {
        if self.value.is_empty() {
            return self.fail(message);
        }
        self
    }

    /// Minimum length in characters, not bytes.
    #[must_use]
    pub fn min_chars(self, min: usize, message: &str) -> Self {
        if self.value.chars().count() < min {
            return self.fail(message);
        }
        self
    }

    #[must_use]
    pub fn max_chars(self, max: usize, message: &str) -> Self {
        if self.value.chars().count() > max {
            return self.fail(message);
        }
        self
    }

    pub fn finish(self, errors: &mut FieldErrors) -> String {
        if let Some(message) = self.error {
            errors.add(self.name, message);
        }
        self.value
    }

    /// Parses a whole number inside `range`.
    pub fn finish_integer(
        self,
        range: RangeInclusive<i32>,
        message: &str,
        errors: &mut FieldErrors,
    ) -> (String, Option<i32>) {
        let parsed = self
            .value
            .parse::<i32>()
            .ok()
            .filter(|n| range.contains(n));
        self.finish_parsed(parsed, message, errors)
    }

    /// Parses a finite decimal number no smaller than `min`.
    pub fn finish_number(
        self,
        min: f64,
        message: &str,
        errors: &mut FieldErrors,
    ) -> (String, Option<f64>) {
        let parsed = self
            .value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= min);
        self.finish_parsed(parsed, message, errors)
    }

    fn finish_parsed<T>(
        self,
        parsed: Option<T>,
        message: &str,
        errors: &mut FieldErrors,
    ) -> (String, Option<T>) {
        let field = if self.error.is_none() && parsed.is_none() {
            self.fail(message)
        } else {
            self
        };
        let ok = field.error.is_none();
        let value = field.finish(errors);
        (value, if ok { parsed } else { None })
    }

    fn fail(mut self, message: &str) -> Self {
        if self.error.is_none() {
            self.error = Some(message.to_string());
        }
        self
    }
}

//! Field-level validation shared by the user and content services.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

lazy_static! {
    static ref URL_REGEX: Regex =
        Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("Invalid URL regex");
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex");
}

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_GENRE_LEN: usize = 100;
pub const MAX_NAME_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Validation failures keyed by the wire name of the offending field.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Ok(()) when nothing was collected, Err(self) otherwise.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Checks a mandatory text field: present, not blank, at most `max_len` chars.
    pub fn require_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        match value.map(str::trim) {
            None => self.add(field, "Este campo es requerido."),
            Some("") => self.add(field, "Este campo no puede estar en blanco."),
            Some(v) => self.check_max_len(field, v, max_len),
        }
    }

    /// Checks an optional text field that, when present, must not be blank.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(v) = value.map(str::trim) {
            if v.is_empty() {
                self.add(field, "Este campo no puede estar en blanco.");
            } else {
                self.check_max_len(field, v, max_len);
            }
        }
    }

    pub fn check_max_len(&mut self, field: &str, value: &str, max_len: usize) {
        if value.chars().count() > max_len {
            self.add(
                field,
                format!("Asegúrese de que este campo no tenga más de {} caracteres.", max_len),
            );
        }
    }

    pub fn require_url(&mut self, field: &str, value: Option<&str>) {
        match value.map(str::trim) {
            None => self.add(field, "Este campo es requerido."),
            Some(v) => self.check_url(field, v),
        }
    }

    /// Optional URL fields accept absence and the empty string.
    pub fn optional_url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.check_url(field, v);
        }
    }

    fn check_url(&mut self, field: &str, value: &str) {
        if !is_valid_url(value) {
            self.add(field, "Introduzca una URL válida.");
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.0.keys().cloned().collect::<Vec<_>>().join(", ");
        write!(f, "Datos inválidos ({})", fields)
    }
}

pub fn is_valid_url(value: &str) -> bool {
    URL_REGEX.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

/// Trims optional free text, mapping blank values to None.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validation helpers shared by request schemas
///
/// Request types derive [`validator::Validate`] and plug the custom rules here
/// in with `#[validate(custom(function = "..."))]`. Whatever the source of an
/// error, it ends up in a [`FieldErrors`] map of field path → reason, which is
/// what the API reports back.
///
/// # Partial updates
///
/// Patch payloads distinguish three states per field with
/// `Option<Option<T>>` and [`double_option`]:
///
/// | JSON            | Rust            | Meaning          |
/// |-----------------|-----------------|------------------|
/// | field absent    | `None`          | leave unchanged  |
/// | `"field": null` | `Some(None)`    | clear the column |
/// | `"field": v`    | `Some(Some(v))` | set to `v`       |
///
/// # Example
///
/// ```
/// use brightline_shared::validation::{double_option, is_valid_slug};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Patch {
///     #[serde(default, deserialize_with = "double_option::deserialize")]
///     icon: Option<Option<String>>,
/// }
///
/// let absent: Patch = serde_json::from_str("{}").unwrap();
/// let cleared: Patch = serde_json::from_str(r#"{"icon": null}"#).unwrap();
/// assert_eq!(absent.icon, None);
/// assert_eq!(cleared.icon, Some(None));
///
/// assert!(is_valid_slug("web-design"));
/// assert!(!is_valid_slug("web--design"));
/// ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Maximum slug length in bytes
pub const MAX_SLUG_LENGTH: usize = 100;

/// Slug grammar: lowercase ASCII letters and digits in groups separated by
/// single hyphens
pub static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid slug regex"));

/// Whether `slug` matches [`SLUG_PATTERN`]
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

/// Builds a [`ValidationError`] with a human-readable message
pub fn error_with_message(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Custom validator for slug fields
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Err(error_with_message("required", "is required"));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(error_with_message(
            "slug",
            format!("must be at most {} characters", MAX_SLUG_LENGTH),
        ));
    }
    if !is_valid_slug(slug) {
        return Err(error_with_message(
            "slug",
            "must contain only lowercase letters, digits and single hyphens between them",
        ));
    }
    Ok(())
}

/// Custom validator for required text: rejects empty or whitespace-only values
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error_with_message("required", "is required"));
    }
    Ok(())
}

/// Checks required text in hand-written validation: not blank, at most `max` characters
pub fn check_required_text(value: &str, max: usize) -> Result<(), ValidationError> {
    validate_not_blank(value)?;
    check_max_chars(value, max)
}

/// Checks that `value` has at most `max` characters
pub fn check_max_chars(value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(error_with_message(
            "length",
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

/// Checks that `value` is one of `allowed`
pub fn check_one_of(value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(error_with_message(
            "one_of",
            format!("must be one of: {}", allowed.join(", ")),
        ))
    }
}

/// Field path → reason
///
/// Paths are dotted, with list indices in brackets, e.g. `features[1].title`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reason for `field`; the first reason per field wins
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| reason.into());
    }

    /// Records the outcome of a single-field check
    pub fn check(&mut self, field: &str, result: Result<(), ValidationError>) {
        if let Err(error) = result {
            self.add(field, reason(&error));
        }
    }

    /// Marks a non-nullable patch field that was sent as `null`
    ///
    /// # Returns
    ///
    /// The new value, if one was given
    pub fn not_null<'a, T>(&mut self, field: &str, value: &'a Option<Option<T>>) -> Option<&'a T> {
        match value {
            Some(None) => {
                self.add(field, "cannot be null");
                None
            }
            Some(Some(v)) => Some(v),
            None => None,
        }
    }

    /// Runs derived validation on a nested value and records its errors under `prefix`
    pub fn nested<T: Validate>(&mut self, prefix: &str, value: &T) {
        if let Err(errors) = value.validate() {
            self.merge_validator(prefix, &errors);
        }
    }

    /// Runs derived validation on every item of a list, prefixing with `field[i]`
    pub fn nested_list<T: Validate>(&mut self, field: &str, items: &[T]) {
        for (index, item) in items.iter().enumerate() {
            self.nested(&format!("{field}[{index}]"), item);
        }
    }

    /// Flattens `validator` errors into this map under `prefix`
    pub fn merge_validator(&mut self, prefix: &str, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let path = join_path(prefix, &field.to_string());
            match kind {
                ValidationErrorsKind::Field(list) => {
                    if let Some(first) = list.first() {
                        self.add(path, reason(first));
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.merge_validator(&path, inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.merge_validator(&format!("{path}[{index}]"), inner);
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        fields.merge_validator("", &errors);
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn reason(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("is invalid ({})", error.code),
    }
}

/// Deserializer for tri-state patch fields
///
/// Use together with `#[serde(default)]` so an absent field stays `None`.
pub mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

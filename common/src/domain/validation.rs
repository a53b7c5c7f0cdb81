use serde::{Deserialize, Deserializer, Serialize};

/// One rejected input field together with a human readable reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Itemized rejection produced by the validation layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(transparent)]
#[error("validation failed: {}", describe(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.0
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

/// Deserializes a field that distinguishes an explicit `null` from an absent key:
/// absent is `None`, `null` is `Some(None)`. Pair with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accumulates field errors so a single pass reports every failing field.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Required field: absent values are reported, present values are parsed.
    pub fn required<R, T>(
        &mut self,
        field: &str,
        value: Option<R>,
        parse: impl FnOnce(R) -> Result<T, String>,
    ) -> Option<T> {
        match value {
            Some(raw) => self.check(field, parse(raw)),
            None => {
                self.error(field, "is required");
                None
            }
        }
    }

    /// Optional field: absent stays absent, present values are parsed.
    pub fn optional<R, T>(
        &mut self,
        field: &str,
        value: Option<R>,
        parse: impl FnOnce(R) -> Result<T, String>,
    ) -> Option<T> {
        value.and_then(|raw| self.check(field, parse(raw)))
    }

    /// Clearable field: absent stays absent, `null` clears, present values are parsed.
    pub fn clearable<R, T>(
        &mut self,
        field: &str,
        value: Option<Option<R>>,
        parse: impl FnOnce(R) -> Result<T, String>,
    ) -> Option<Option<T>> {
        match value? {
            Some(raw) => self.check(field, parse(raw)).map(Some),
            None => Some(None),
        }
    }

    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.error(field, message);
                None
            }
        }
    }

    /// Re-reports errors of a nested structure under `prefix`.
    pub fn nested(&mut self, prefix: &str, errors: ValidationErrors) {
        for e in errors.0 {
            self.error(format!("{prefix}.{}", e.field), e.message);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.errors))
        }
    }

    pub fn into_errors(self) -> ValidationErrors {
        ValidationErrors(self.errors)
    }
}

/// Trimmed, non-empty text of at most `max` characters.
pub fn text(max: usize) -> impl FnOnce(String) -> Result<String, String> {
    move |raw| {
        let value = raw.trim();
        if value.is_empty() {
            Err("must not be empty".to_owned())
        } else if value.chars().count() > max {
            Err(format!("must be at most {max} characters"))
        } else {
            Ok(value.to_owned())
        }
    }
}

/// Trimmed text that may be empty.
pub fn plain(raw: String) -> Result<String, String> {
    Ok(raw.trim().to_owned())
}

/// Reference to a document or image: an absolute http(s) URL or a path
/// produced by the upload endpoint.
pub fn link(raw: String) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("must not be empty".to_owned());
    }
    if value.chars().any(char::is_whitespace) {
        return Err("must be a valid link".to_owned());
    }
    let absolute = value.starts_with("http://") || value.starts_with("https://");
    if absolute || value.starts_with('/') {
        Ok(value.to_owned())
    } else {
        Err("must be an http(s) URL or an absolute path".to_owned())
    }
}

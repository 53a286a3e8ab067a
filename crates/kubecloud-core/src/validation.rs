// ── Validation engine ──
//
// Pure evaluation of a declarative rule set against one field value,
// composed into whole-form validation. Failures are returned as result
// values, never raised.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

const DEFAULT_FIELD_NAME: &str = "Field";
const PASSWORD_MESSAGE: &str = "Password must contain at least 8 characters, including uppercase, lowercase, number, and special character";

// ── Patterns ─────────────────────────────────────────────────────────

pub mod patterns {
    use std::sync::LazyLock;

    use regex::Regex;

    fn compile(pattern: &str) -> Regex {
        Regex::new(pattern).expect("built-in validation pattern is valid")
    }

    pub static EMAIL: LazyLock<Regex> = LazyLock::new(|| compile(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));
    pub static URL: LazyLock<Regex> = LazyLock::new(|| compile(r"^https?://.+"));
    pub static PHONE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\+?[\d\s\-()]+$"));
    pub static ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z0-9]+$"));
    pub static HEX_COLOR: LazyLock<Regex> =
        LazyLock::new(|| compile(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$"));
    pub static IP_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
        compile(
            r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
        )
    });

    const PASSWORD_SPECIALS: &str = "@$!%*?&";

    /// Strong-password shape; see [`is_strong_password`].
    pub static PASSWORD: super::Pattern = super::Pattern::Predicate(is_strong_password);

    /// At least 8 characters drawn from letters, digits and `@$!%*?&`,
    /// with at least one of each: lowercase, uppercase, digit, special.
    pub fn is_strong_password(value: &str) -> bool {
        let allowed = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
        allowed
            && value.chars().count() >= 8
            && value.chars().any(|c| c.is_ascii_lowercase())
            && value.chars().any(|c| c.is_ascii_uppercase())
            && value.chars().any(|c| c.is_ascii_digit())
            && value.chars().any(|c| PASSWORD_SPECIALS.contains(c))
    }
}

/// A format constraint: a regular expression or a predicate for shapes the
/// regex engine cannot express.
#[derive(Clone)]
pub enum Pattern {
    Regex(Regex),
    Predicate(fn(&str) -> bool),
}

impl Pattern {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(value),
            Self::Predicate(check) => check(value),
        }
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}

impl From<&Pattern> for Pattern {
    fn from(pattern: &Pattern) -> Self {
        pattern.clone()
    }
}

impl From<&LazyLock<Regex>> for Pattern {
    fn from(re: &LazyLock<Regex>) -> Self {
        Self::Regex(Regex::clone(re))
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

// ── Values and rules ─────────────────────────────────────────────────

/// The value under validation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FieldValue {
    /// Absent values: `Empty`, whitespace-only text and `false`. Numbers
    /// are always present, including zero.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(b) => !b,
            Self::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// Outcome of a custom predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Pass,
    /// Failure with the generic "<field> is invalid" message.
    Fail,
    /// Failure with a caller-supplied message.
    Message(String),
}

impl From<bool> for Check {
    fn from(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }
}

type CustomCheck = Arc<dyn Fn(&FieldValue) -> Check + Send + Sync>;

/// Declarative rule set for one field.
#[derive(Clone, Default)]
pub struct Rules {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub email: bool,
    pub url: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    custom: Option<CustomCheck>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub fn url(mut self) -> Self {
        self.url = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn custom(mut self, check: impl Fn(&FieldValue) -> Check + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(check));
        self
    }

    // ── Presets ──────────────────────────────────────────────────────

    pub fn preset_required() -> Self {
        Self::new().required()
    }

    pub fn preset_email() -> Self {
        Self::new().required().email()
    }

    pub fn preset_password() -> Self {
        Self::new()
            .required()
            .min_length(8)
            .pattern(&patterns::PASSWORD)
            .custom(|value| match value.as_text() {
                Some(s) if patterns::is_strong_password(s) => Check::Pass,
                _ => Check::Message(PASSWORD_MESSAGE.to_owned()),
            })
    }

    pub fn preset_url() -> Self {
        Self::new().required().url()
    }

    pub fn preset_phone() -> Self {
        Self::new().required().pattern(&patterns::PHONE)
    }

    pub fn preset_alphanumeric() -> Self {
        Self::new().required().pattern(&patterns::ALPHANUMERIC)
    }

    pub fn preset_hex_color() -> Self {
        Self::new().pattern(&patterns::HEX_COLOR)
    }

    pub fn preset_ip_address() -> Self {
        Self::new().pattern(&patterns::IP_ADDRESS)
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern)
            .field("email", &self.email)
            .field("url", &self.url)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// A value, its rules, and an optional display name.
#[derive(Debug, Clone)]
pub struct FieldValidation {
    pub value: FieldValue,
    pub rules: Rules,
    pub field_name: Option<String>,
}

impl FieldValidation {
    pub fn new(value: impl Into<FieldValue>, rules: Rules) -> Self {
        Self {
            value: value.into(),
            rules,
            field_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

// ── Evaluation ───────────────────────────────────────────────────────

/// Evaluate `rules` against `value`.
///
/// Order: required; then, for present values, length bounds, pattern,
/// email and url (text), numeric bounds (numbers), and finally the custom
/// predicate. Every applicable rule is reported.
pub fn validate_field(value: &FieldValue, rules: &Rules, field_name: Option<&str>) -> ValidationResult {
    let name = field_name.unwrap_or(DEFAULT_FIELD_NAME);
    let mut errors = Vec::new();

    if value.is_absent() {
        if rules.required {
            errors.push(format!("{name} is required"));
        }
        return ValidationResult::from_errors(errors);
    }

    match value {
        FieldValue::Text(text) => {
            let len = text.chars().count();
            if let Some(min) = rules.min_length.filter(|&min| len < min) {
                errors.push(format!("{name} must be at least {min} characters"));
            }
            if let Some(max) = rules.max_length.filter(|&max| len > max) {
                errors.push(format!("{name} must be no more than {max} characters"));
            }
            if rules.pattern.as_ref().is_some_and(|p| !p.matches(text)) {
                errors.push(format!("{name} format is invalid"));
            }
            if rules.email && !patterns::EMAIL.is_match(text) {
                errors.push(format!("{name} must be a valid email address"));
            }
            if rules.url && !patterns::URL.is_match(text) {
                errors.push(format!("{name} must be a valid URL"));
            }
        }
        FieldValue::Number(n) => {
            if let Some(min) = rules.min.filter(|&min| *n < min) {
                errors.push(format!("{name} must be at least {min}"));
            }
            if let Some(max) = rules.max.filter(|&max| *n > max) {
                errors.push(format!("{name} must be no more than {max}"));
            }
        }
        FieldValue::Empty | FieldValue::Bool(_) => {}
    }

    if let Some(ref custom) = rules.custom {
        match custom(value) {
            Check::Pass => {}
            Check::Fail => errors.push(format!("{name} is invalid")),
            Check::Message(message) => errors.push(message),
        }
    }

    ValidationResult::from_errors(errors)
}

/// Validate every field, in map order, aggregating all errors. A field
/// without an explicit name uses its map key.
pub fn validate_form(fields: &IndexMap<String, FieldValidation>) -> ValidationResult {
    let errors = fields
        .iter()
        .flat_map(|(key, field)| {
            let name = field.field_name.as_deref().unwrap_or(key);
            validate_field(&field.value, &field.rules, Some(name)).errors
        })
        .collect();
    ValidationResult::from_errors(errors)
}

/// Run the synchronous rules, then `validator` if they passed.
///
/// A validator error is reported as "Validation error occurred" rather
/// than propagated.
pub async fn validate_async<F, Fut, E>(field: &FieldValidation, validator: F) -> ValidationResult
where
    F: FnOnce(FieldValue) -> Fut,
    Fut: Future<Output = Result<Check, E>>,
{
    let sync = validate_field(&field.value, &field.rules, field.field_name.as_deref());
    if !sync.is_valid {
        return sync;
    }

    let failure = match validator(field.value.clone()).await {
        Ok(Check::Pass) => return sync,
        Ok(Check::Fail) => "Validation failed".to_owned(),
        Ok(Check::Message(message)) => message,
        Err(_) => "Validation error occurred".to_owned(),
    };
    let mut errors = sync.errors;
    errors.push(failure);
    ValidationResult::from_errors(errors)
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Trim and strip angle brackets.
pub fn sanitize_input(input: &str) -> String {
    input.trim().chars().filter(|c| !matches!(c, '<' | '>')).collect()
}

pub fn format_validation_errors(errors: &[String]) -> String {
    errors.join(". ")
}

//! # Validation Module
//!
//! Rule-driven field validation with structured errors for API responses.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: `Rule` checks one thing, `Validator` runs them all, `ValidationErrors` reports
//! - **O**: Extensible error codes via enum
//! - **L**: All validation errors implement common traits
//!
//! Rule specs are compact strings: `required`, `numeric`, `email`, `min:5`,
//! `max:16`, or a slash-delimited regular expression such as `/^[a-z]+$/i`.
//! Every rule of every field runs; nothing short-circuits.

use crate::error::{Error, Result};
use crate::value::Params;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Field name to ordered rule specs
pub type RuleSet<'r> = [(&'r str, &'r [&'r str])];

const LOCAL_PART_MAX: usize = 64;
const DOMAIN_MAX: usize = 190;
const LABEL_MAX: usize = 63;
const LOCAL_SPECIALS: &str = "_!#$%&'*+-/=?^`{}|~";
const REGEX_FLAGS: &str = "imsxu";

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required field is missing or blank
    Required,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value is not a number
    NotNumeric,
    /// Value doesn't match pattern
    InvalidFormat,
    /// Email local part over 64 characters
    LocalPartTooLong,
    /// Email domain over 190 characters
    DomainTooLong,
    /// Email domain label over 63 characters
    LabelTooLong,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    /// Field name (e.g., "email")
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "required field" error
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("The {field} field is required."),
            field,
            code: ValidationCode::Required,
        }
    }

    /// Create a "too short" error
    pub fn too_short(field: impl Into<String>, min: usize) -> Self {
        let field = field.into();
        Self {
            message: format!("The {field} field must be at least {min} characters."),
            field,
            code: ValidationCode::TooShort,
        }
    }

    /// Create a "too long" error
    pub fn too_long(field: impl Into<String>, max: usize) -> Self {
        let field = field.into();
        Self {
            message: format!("The {field} field must be at most {max} characters."),
            field,
            code: ValidationCode::TooLong,
        }
    }

    /// Create a "not a number" error
    pub fn not_numeric(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("The {field} field only accepts numbers."),
            field,
            code: ValidationCode::NotNumeric,
        }
    }

    /// Create a "pattern mismatch" error
    pub fn invalid(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("The {field} field is invalid."),
            field,
            code: ValidationCode::InvalidFormat,
        }
    }
}

/// Field to ordered list of errors
///
/// Serializes as `{ "field": ["message", ...] }`. A field with no entry had no
/// violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.fields.entry(error.field.clone()).or_default().push(error);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one error
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Messages for one field, in rule order
    #[must_use]
    pub fn messages(&self, field: &str) -> Vec<&str> {
        self.fields
            .get(field)
            .map(|errs| errs.iter().map(|e| e.message.as_str()).collect())
            .unwrap_or_default()
    }

    /// Codes for one field, in rule order
    #[must_use]
    pub fn codes(&self, field: &str) -> Vec<ValidationCode> {
        self.fields
            .get(field)
            .map(|errs| errs.iter().map(|e| e.code).collect())
            .unwrap_or_default()
    }

    /// Field to messages
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.fields
            .iter()
            .map(|(field, errs)| {
                (
                    field.clone(),
                    errs.iter().map(|e| e.message.clone()).collect(),
                )
            })
            .collect()
    }

    /// Iterate over every error
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.fields.values().flatten()
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, errs) in &self.fields {
            let messages: Vec<&str> = errs.iter().map(|e| e.message.as_str()).collect();
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

/// One compiled rule
#[derive(Debug, Clone)]
enum Rule {
    Required,
    Min(usize),
    Max(usize),
    Numeric,
    Email,
    Regexp(Regex),
}

impl Rule {
    /// Compile a rule spec
    fn parse(spec: &str) -> Result<Self> {
        if spec.starts_with('/') {
            return compile_regexp(spec).map(Self::Regexp);
        }

        let (name, param) = match spec.split_once(':') {
            Some((name, param)) => (name, Some(param)),
            None => (spec, None),
        };

        match (name, param) {
            ("required", None) => Ok(Self::Required),
            ("numeric", None) => Ok(Self::Numeric),
            ("email", None) => Ok(Self::Email),
            ("min", Some(n)) => parse_length(spec, n).map(Self::Min),
            ("max", Some(n)) => parse_length(spec, n).map(Self::Max),
            ("regexp", Some(pattern)) => compile_regexp(pattern).map(Self::Regexp),
            ("required" | "numeric" | "email", Some(_)) => Err(Error::configuration(format!(
                "validation rule '{name}' takes no parameter"
            ))),
            ("min" | "max" | "regexp", None) => Err(Error::configuration(format!(
                "validation rule '{name}' requires a parameter"
            ))),
            _ => Err(Error::configuration(format!(
                "validation rule '{name}' does not exist"
            ))),
        }
    }

    fn check(&self, field: &str, value: &str, errors: &mut ValidationErrors) {
        match self {
            Self::Required => {
                if value.is_empty() {
                    errors.add(FieldError::required(field));
                }
            }
            Self::Min(min) => {
                if value.chars().count() < *min {
                    errors.add(FieldError::too_short(field, *min));
                }
            }
            Self::Max(max) => {
                if value.chars().count() > *max {
                    errors.add(FieldError::too_long(field, *max));
                }
            }
            Self::Numeric => {
                if !is_numeric(value) {
                    errors.add(FieldError::not_numeric(field));
                }
            }
            Self::Regexp(re) => {
                if !re.is_match(value) {
                    errors.add(FieldError::invalid(field));
                }
            }
            Self::Email => check_email(field, value, errors),
        }
    }
}

fn parse_length(spec: &str, param: &str) -> Result<usize> {
    param.trim().parse().map_err(|_| {
        Error::configuration(format!(
            "validation rule '{spec}' needs a non-negative integer parameter"
        ))
    })
}

/// Compile `/pattern/flags`
fn compile_regexp(spec: &str) -> Result<Regex> {
    let invalid = || Error::configuration(format!("invalid regular expression rule '{spec}'"));

    let body = spec.strip_prefix('/').ok_or_else(invalid)?;
    let close = body.rfind('/').ok_or_else(invalid)?;
    let (pattern, flags) = (&body[..close], &body[close + 1..]);
    if !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
        return Err(invalid());
    }

    let inline: String = flags.chars().filter(|&c| c != 'u').collect();
    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    Regex::new(&source).map_err(|e| {
        Error::configuration(format!("invalid regular expression rule '{spec}': {e}"))
    })
}

/// Optional sign, digits with optional fraction, optional exponent
fn is_numeric(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && value.parse::<f64>().is_ok_and(f64::is_finite)
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(c)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

/// Structural check first; length checks only for well-formed addresses
fn check_email(field: &str, value: &str, errors: &mut ValidationErrors) {
    let well_formed = value.split_once('@').filter(|(local, domain)| {
        !local.is_empty()
            && local
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(is_local_char))
            && domain.split('.').all(is_valid_label)
    });

    let Some((local, domain)) = well_formed else {
        errors.add(FieldError::new(
            field,
            "Invalid email format.",
            ValidationCode::InvalidFormat,
        ));
        return;
    };

    if local.chars().count() > LOCAL_PART_MAX {
        errors.add(FieldError::new(
            field,
            format!("The local part of the email address must be at most {LOCAL_PART_MAX} characters."),
            ValidationCode::LocalPartTooLong,
        ));
    }

    if domain.chars().count() > DOMAIN_MAX {
        errors.add(FieldError::new(
            field,
            format!("The domain of the email address must be at most {DOMAIN_MAX} characters."),
            ValidationCode::DomainTooLong,
        ));
    } else {
        for label in domain.split('.').filter(|l| l.chars().count() > LABEL_MAX) {
            errors.add(FieldError::new(
                field,
                format!("Domain label '{label}' must be at most {LABEL_MAX} characters."),
                ValidationCode::LabelTooLong,
            ));
        }
    }
}

/// Runs a rule set against input data
///
/// All checks happen in [`Validator::new`]. A missing field reads as the
/// empty string; every value is trimmed before checking.
#[derive(Debug, Clone)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    /// Validate `data` against `rules`
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if any rule spec is unknown or malformed.
    /// Specs are compiled before any field is evaluated.
    pub fn new(data: &Params, rules: &RuleSet<'_>) -> Result<Self> {
        let compiled = rules
            .iter()
            .map(|(field, specs)| {
                specs
                    .iter()
                    .map(|spec| Rule::parse(spec))
                    .collect::<Result<Vec<_>>>()
                    .map(|rules| (*field, rules))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut errors = ValidationErrors::new();
        for (field, field_rules) in &compiled {
            let raw = data.get(*field).map(|v| v.as_text()).unwrap_or_default();
            let value = raw.trim();
            for rule in field_rules {
                rule.check(field, value, &mut errors);
            }
        }

        Ok(Self { errors })
    }

    /// True iff no field has an error
    #[must_use]
    pub fn passes(&self) -> bool {
        self.errors.is_empty()
    }

    /// Accumulated errors
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Field to messages
    #[must_use]
    pub fn get_errors(&self) -> BTreeMap<String, Vec<String>> {
        self.errors.to_map()
    }

    /// `Ok(())` when passing, otherwise `Error::Validation`
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` carrying every message.
    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

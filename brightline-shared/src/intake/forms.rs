/// Public form schemas
///
/// Contact, quote and demo forms share the same life: validate, pass the
/// security gate, store a normalized payload, fan out to email and CRM. The
/// per-form parts of that are captured by [`IntakeForm`].
///
/// Every field is `#[serde(default)]`, so a missing required field shows up as
/// a field error ("is required") rather than a body parse error, and a missing
/// CAPTCHA token reaches the security gate instead of failing validation.
/// Dates travel as strings for the same reason and are parsed by validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use validator::{Validate, ValidationError};

use crate::models::form_submission::FormType;
use crate::security::sanitize::sanitize_text;
use crate::validation::{check_one_of, error_with_message, validate_not_blank, validate_slug};

/// Accepted `budget_range` values for quote requests
pub const BUDGET_RANGES: &[&str] = &["under-10k", "10k-25k", "25k-50k", "50k-100k", "over-100k"];

/// Accepted `timeline` values for quote requests
pub const TIMELINES: &[&str] = &["asap", "1-3-months", "3-6-months", "6-plus-months", "flexible"];

/// Accepted `team_size` values for demo requests
pub const TEAM_SIZES: &[&str] = &["1-10", "11-50", "51-200", "201-1000", "1000-plus"];

fn validate_budget_range(value: &str) -> Result<(), ValidationError> {
    check_one_of(value, BUDGET_RANGES)
}

fn validate_timeline(value: &str) -> Result<(), ValidationError> {
    check_one_of(value, TIMELINES)
}

fn validate_team_size(value: &str) -> Result<(), ValidationError> {
    check_one_of(value, TEAM_SIZES)
}

fn validate_service_slugs(slugs: &[String]) -> Result<(), ValidationError> {
    slugs.iter().try_for_each(|slug| validate_slug(slug))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(error_with_message("date", "must be a date in YYYY-MM-DD format")),
    }
}

/// Who the submission came from, as submitted apart from normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub full_name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// A form the intake pipeline can process
pub trait IntakeForm: Validate + Send + Sync {
    /// Stored `form_type`
    const FORM_TYPE: FormType;

    /// CAPTCHA token sent with the form, if any
    fn captcha_token(&self) -> Option<&str>;

    /// Free-text fields screened for unsafe input, as (field name, value)
    fn text_fields(&self) -> Vec<(&'static str, &str)>;

    /// Normalized fields to store, without the CAPTCHA token
    fn payload(&self) -> JsonValue;

    fn submitter(&self) -> Submitter;
}

fn clean(value: &str) -> String {
    sanitize_text(value)
}

fn clean_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(sanitize_text)
        .filter(|v| !v.is_empty())
}

/// Inserts `key: value` unless the value is absent
fn put_opt(map: &mut Map<String, JsonValue>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        map.insert(key.to_string(), JsonValue::String(value));
    }
}

fn push_opt<'a>(fields: &mut Vec<(&'static str, &'a str)>, name: &'static str, value: &'a Option<String>) {
    if let Some(value) = value.as_deref() {
        fields.push((name, value));
    }
}

/// General enquiry
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ContactForm {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub full_name: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub company: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub subject: Option<String>,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 5000, message = "must be at most 5000 characters")
    )]
    pub message: String,

    pub captcha_token: Option<String>,
}

impl IntakeForm for ContactForm {
    const FORM_TYPE: FormType = FormType::Contact;

    fn captcha_token(&self) -> Option<&str> {
        self.captcha_token.as_deref()
    }

    fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("full_name", self.full_name.as_str()),
            ("email", self.email.as_str()),
            ("message", self.message.as_str()),
        ];
        push_opt(&mut fields, "phone", &self.phone);
        push_opt(&mut fields, "company", &self.company);
        push_opt(&mut fields, "subject", &self.subject);
        fields
    }

    fn payload(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("full_name".into(), json!(clean(&self.full_name)));
        map.insert("email".into(), json!(clean(&self.email)));
        put_opt(&mut map, "phone", clean_opt(&self.phone));
        put_opt(&mut map, "company", clean_opt(&self.company));
        put_opt(&mut map, "subject", clean_opt(&self.subject));
        map.insert("message".into(), json!(clean(&self.message)));
        JsonValue::Object(map)
    }

    fn submitter(&self) -> Submitter {
        Submitter {
            full_name: clean(&self.full_name),
            email: clean(&self.email),
            company: clean_opt(&self.company),
            phone: clean_opt(&self.phone),
        }
    }
}

/// Request for a project quote
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QuoteForm {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub full_name: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub company: Option<String>,

    /// Slugs of the services the quote is about
    #[validate(
        length(max = 20, message = "must list at most 20 services"),
        custom(function = "validate_service_slugs")
    )]
    pub services: Vec<String>,

    #[validate(custom(function = "validate_budget_range"))]
    pub budget_range: String,

    #[validate(custom(function = "validate_timeline"))]
    pub timeline: Option<String>,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 5000, message = "must be at most 5000 characters")
    )]
    pub project_description: String,

    pub captcha_token: Option<String>,
}

impl IntakeForm for QuoteForm {
    const FORM_TYPE: FormType = FormType::Quote;

    fn captcha_token(&self) -> Option<&str> {
        self.captcha_token.as_deref()
    }

    fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("full_name", self.full_name.as_str()),
            ("email", self.email.as_str()),
            ("project_description", self.project_description.as_str()),
        ];
        push_opt(&mut fields, "phone", &self.phone);
        push_opt(&mut fields, "company", &self.company);
        fields
    }

    fn payload(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("full_name".into(), json!(clean(&self.full_name)));
        map.insert("email".into(), json!(clean(&self.email)));
        put_opt(&mut map, "phone", clean_opt(&self.phone));
        put_opt(&mut map, "company", clean_opt(&self.company));
        map.insert("services".into(), json!(self.services));
        map.insert("budget_range".into(), json!(self.budget_range));
        put_opt(&mut map, "timeline", self.timeline.clone());
        map.insert(
            "project_description".into(),
            json!(clean(&self.project_description)),
        );
        JsonValue::Object(map)
    }

    fn submitter(&self) -> Submitter {
        Submitter {
            full_name: clean(&self.full_name),
            email: clean(&self.email),
            company: clean_opt(&self.company),
            phone: clean_opt(&self.phone),
        }
    }
}

/// Request for a product demo
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DemoForm {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub full_name: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub company: String,

    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub job_title: Option<String>,

    #[validate(custom(function = "validate_team_size"))]
    pub team_size: String,

    /// `YYYY-MM-DD`
    #[validate(custom(function = "validate_date"))]
    pub preferred_date: Option<String>,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub message: Option<String>,

    pub captcha_token: Option<String>,
}

impl DemoForm {
    /// Parsed `preferred_date`; `None` when absent or malformed
    pub fn preferred_date(&self) -> Option<NaiveDate> {
        self.preferred_date.as_deref().and_then(parse_date)
    }
}

impl IntakeForm for DemoForm {
    const FORM_TYPE: FormType = FormType::Demo;

    fn captcha_token(&self) -> Option<&str> {
        self.captcha_token.as_deref()
    }

    fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("full_name", self.full_name.as_str()),
            ("email", self.email.as_str()),
            ("company", self.company.as_str()),
        ];
        push_opt(&mut fields, "phone", &self.phone);
        push_opt(&mut fields, "job_title", &self.job_title);
        push_opt(&mut fields, "message", &self.message);
        fields
    }

    fn payload(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("full_name".into(), json!(clean(&self.full_name)));
        map.insert("email".into(), json!(clean(&self.email)));
        map.insert("company".into(), json!(clean(&self.company)));
        put_opt(&mut map, "phone", clean_opt(&self.phone));
        put_opt(&mut map, "job_title", clean_opt(&self.job_title));
        map.insert("team_size".into(), json!(self.team_size));
        put_opt(
            &mut map,
            "preferred_date",
            self.preferred_date().map(|d| d.to_string()),
        );
        put_opt(&mut map, "message", clean_opt(&self.message));
        JsonValue::Object(map)
    }

    fn submitter(&self) -> Submitter {
        Submitter {
            full_name: clean(&self.full_name),
            email: clean(&self.email),
            company: Some(clean(&self.company)).filter(|c| !c.is_empty()),
            phone: clean_opt(&self.phone),
        }
    }
}

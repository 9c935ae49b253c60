use std::num::IntErrorKind;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::Type;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::model::NewMatch;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl MatchStatus {
    /// Status of a match window at `now`. Both bounds count as live.
    pub fn derive(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            MatchStatus::Scheduled
        } else if now <= end {
            MatchStatus::Live
        } else {
            MatchStatus::Finished
        }
    }
}

/// One rejected input, addressed by its wire field name. `path` is empty for
/// problems with the payload as a whole.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: Option<&str>, code: &str, message: impl Into<String>) -> Self {
        Self {
            path: field.map(|f| vec![f.to_string()]).unwrap_or_default(),
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn from_error(field: &str, error: &ValidationError) -> Self {
        let path = if field == "__all__" {
            None
        } else {
            Some(to_camel_case(field))
        };
        let message = error
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| default_message(error));
        Self::new(path.as_deref(), &error.code, message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationIssues(pub Vec<ValidationIssue>);

impl ValidationIssues {
    pub fn field(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self(vec![ValidationIssue::new(Some(field), code, message)])
    }

    pub fn payload(code: &str, message: impl Into<String>) -> Self {
        Self(vec![ValidationIssue::new(None, code, message)])
    }

    #[cfg(test)]
    pub fn touches(&self, field: &str) -> bool {
        self.0.iter().any(|issue| issue.path.iter().any(|p| p == field))
    }
}

impl From<ValidationErrors> for ValidationIssues {
    fn from(errors: ValidationErrors) -> Self {
        let mut issues: Vec<ValidationIssue> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter()
                    .map(move |e| ValidationIssue::from_error(&field, e))
            })
            .collect();
        // field_errors() is a HashMap
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        Self(issues)
    }
}

fn default_message(error: &ValidationError) -> String {
    match &*error.code {
        "required" => "Required".to_string(),
        "range" => match error.params.get("min") {
            Some(min) => format!("Must be greater than or equal to {}", min),
            None => "Out of range".to_string(),
        },
        code => format!("Invalid value ({})", code),
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// Raw query string, before any validation
#[derive(Deserialize, Debug, Default)]
pub struct LimitQueryParams {
    pub limit: Option<String>,
}

#[derive(Debug, Validate)]
pub struct LimitMatchesQuery {
    #[validate(range(min = 1))]
    limit: Option<i64>,
}

impl LimitMatchesQuery {
    pub fn parse(params: LimitQueryParams) -> Result<Self, ValidationIssues> {
        let limit = match params.limit.as_deref().map(str::trim) {
            None => None,
            Some(raw) => Some(parse_integer(raw).ok_or_else(|| {
                ValidationIssues::field(
                    "limit",
                    "invalid_type",
                    format!("Expected integer, received {:?}", raw),
                )
            })?),
        };

        let query = Self { limit };
        query.validate()?;
        Ok(query)
    }

    /// Requested limit, defaulted and capped at [`MAX_LIMIT`].
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        // Oversized integers saturate so the cap or the range check applies.
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => Some(i64::MAX),
        Err(e) if matches!(e.kind(), IntErrorKind::NegOverflow) => Some(i64::MIN),
        Err(_) => None,
    }
}

#[derive(Debug, Default, Validate)]
pub struct CreateMatchSchema {
    #[validate(required, custom(function = "validate_timestamp"))]
    start_time: Option<String>,
    #[validate(required, custom(function = "validate_timestamp"))]
    end_time: Option<String>,
    #[validate(range(min = 0))]
    home_score: Option<i32>,
    #[validate(range(min = 0))]
    away_score: Option<i32>,
}

fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    parse_timestamp(value).map(|_| ()).ok_or_else(|| {
        let mut err = ValidationError::new("invalid_datetime");
        err.message = Some("Expected an RFC 3339 timestamp".into());
        err
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn timestamp_field(field: &str, value: Option<&str>) -> Result<DateTime<Utc>, ValidationIssues> {
    let value = value.ok_or_else(|| ValidationIssues::field(field, "required", "Required"))?;
    parse_timestamp(value).ok_or_else(|| {
        ValidationIssues::field(field, "invalid_datetime", "Expected an RFC 3339 timestamp")
    })
}

fn typed_field<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    name: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<T> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                issues.push(ValidationIssue::new(Some(name), "invalid_type", e.to_string()));
                None
            }
        },
    }
}

/// A create payload that passed [`CreateMatchSchema::parse`].
#[derive(Clone, Debug, PartialEq)]
pub struct CreateMatch {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub home_score: i32,
    pub away_score: i32,
}

impl CreateMatchSchema {
    /// Reads each known field on its own so a wrong JSON type is reported
    /// against that field alongside the other field issues.
    fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationIssues> {
        let mut issues = Vec::new();
        let schema = Self {
            start_time: typed_field(fields, "startTime", &mut issues),
            end_time: typed_field(fields, "endTime", &mut issues),
            home_score: typed_field(fields, "homeScore", &mut issues),
            away_score: typed_field(fields, "awayScore", &mut issues),
        };

        if let Err(errors) = schema.validate() {
            let mistyped: Vec<String> = issues
                .iter()
                .flat_map(|issue| issue.path.clone())
                .collect();
            // A mistyped field reads as absent; drop the resulting `required`.
            issues.extend(
                ValidationIssues::from(errors)
                    .0
                    .into_iter()
                    .filter(|issue| !issue.path.iter().any(|p| mistyped.contains(p))),
            );
        }

        if issues.is_empty() {
            Ok(schema)
        } else {
            issues.sort_by(|a, b| a.path.cmp(&b.path));
            Err(ValidationIssues(issues))
        }
    }

    pub fn parse(body: Value) -> Result<CreateMatch, ValidationIssues> {
        let Value::Object(fields) = body else {
            return Err(ValidationIssues::payload(
                "invalid_type",
                "Expected a JSON object",
            ));
        };
        let schema = Self::from_fields(&fields)?;

        let start_time = timestamp_field("startTime", schema.start_time.as_deref())?;
        let end_time = timestamp_field("endTime", schema.end_time.as_deref())?;
        if end_time < start_time {
            return Err(ValidationIssues::field(
                "endTime",
                "invalid_range",
                "endTime must not be before startTime",
            ));
        }

        Ok(CreateMatch {
            start_time,
            end_time,
            home_score: schema.home_score.unwrap_or(0),
            away_score: schema.away_score.unwrap_or(0),
        })
    }
}

impl CreateMatch {
    pub fn into_new_match(self, now: DateTime<Utc>) -> NewMatch {
        NewMatch {
            status: MatchStatus::derive(self.start_time, self.end_time, now),
            start_time: self.start_time,
            end_time: self.end_time,
            home_score: self.home_score,
            away_score: self.away_score,
        }
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::domain::DocumentId;
use crate::domain::entities::{
    Author, AuthorInput, Entity, TITLE_MAX_LENGTH, validate_authors,
};
use crate::domain::persistence::Filter;
use crate::domain::validation::{ValidationErrors, Validator, link, nullable, plain, text};

pub const EVENTS_COLLECTION: &str = "events";
pub const STATUS_FIELD_NAME: &str = "status";

pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const EVENT_TIME_FORMAT: &str = "%H:%M";

/// Drives visibility of an event in listings.
///
/// Read case-insensitively, written in its canonical spelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum EventStatus {
    #[default]
    Active,
    Inactive,
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(EventStatus::Active),
            "inactive" => Ok(EventStatus::Inactive),
            _ => Err("must be one of: Active, Inactive".to_owned()),
        }
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Active => f.write_str("Active"),
            EventStatus::Inactive => f.write_str("Inactive"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub registration_link: Option<String>,
    pub status: EventStatus,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: Option<String>,
    pub authors: Option<Vec<AuthorInput>>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM`
    pub time: Option<String>,
    pub medium: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub registration_link: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Option<String>>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub authors: Vec<Author>,
    pub date: NaiveDate,
    #[serde(serialize_with = "clock_time::serialize")]
    pub time: NaiveTime,
    pub medium: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link: Option<String>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "clock_time::serialize_some"
    )]
    pub time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub status: Option<EventStatus>,
}

/// Times of day travel as `HH:MM`.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::EVENT_TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(EVENT_TIME_FORMAT))
    }

    pub fn serialize_some<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, EVENT_TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(D::Error::custom)
    }
}

fn parse_date(raw: String) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), EVENT_DATE_FORMAT)
        .map_err(|_| "must be a calendar date formatted as YYYY-MM-DD".to_owned())
}

fn parse_time(raw: String) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), EVENT_TIME_FORMAT)
        .map_err(|_| "must be a time of day formatted as HH:MM".to_owned())
}

fn parse_status(raw: String) -> Result<EventStatus, String> {
    raw.parse()
}

impl Entity for Event {
    const COLLECTION: &'static str = EVENTS_COLLECTION;
    const NAME: &'static str = "Event";

    type Input = EventInput;
    type Draft = NewEvent;
    type Patch = EventPatch;
    type Query = EventQuery;

    fn validate_create(input: EventInput) -> Result<NewEvent, ValidationErrors> {
        let mut v = Validator::new();
        let title = v.required("title", input.title, text(TITLE_MAX_LENGTH));
        let authors = validate_authors(&mut v, "authors", input.authors.unwrap_or_default());
        let date = v.required("date", input.date, parse_date);
        let time = v.required("time", input.time, parse_time);
        let medium = v.optional("medium", input.medium, plain).unwrap_or_default();
        let location = v
            .optional("location", input.location, plain)
            .unwrap_or_default();
        let registration_link =
            v.optional("registrationLink", input.registration_link.flatten(), link);
        let status = v.optional("status", input.status, parse_status).unwrap_or_default();
        let thumbnail = v.optional("thumbnail", input.thumbnail.flatten(), link);
        let description = v
            .optional("description", input.description, plain)
            .unwrap_or_default();

        match (title, date, time) {
            (Some(title), Some(date), Some(time)) => v.finish(NewEvent {
                title,
                authors,
                date,
                time,
                medium,
                location,
                registration_link,
                status,
                thumbnail,
                description,
            }),
            _ => Err(v.into_errors()),
        }
    }

    fn validate_patch(input: EventInput) -> Result<EventPatch, ValidationErrors> {
        let mut v = Validator::new();
        let patch = EventPatch {
            title: v.optional("title", input.title, text(TITLE_MAX_LENGTH)),
            authors: input
                .authors
                .map(|authors| validate_authors(&mut v, "authors", authors)),
            date: v.optional("date", input.date, parse_date),
            time: v.optional("time", input.time, parse_time),
            medium: v.optional("medium", input.medium, plain),
            location: v.optional("location", input.location, plain),
            registration_link: v.clearable("registrationLink", input.registration_link, link),
            status: v.optional("status", input.status, parse_status),
            thumbnail: v.clearable("thumbnail", input.thumbnail, link),
            description: v.optional("description", input.description, plain),
        };
        v.finish(patch)
    }

    fn list_filter(query: &EventQuery) -> Filter {
        match query.status {
            Some(status) => Filter::new().equals(STATUS_FIELD_NAME, status.to_string()),
            None => Filter::new(),
        }
    }
}

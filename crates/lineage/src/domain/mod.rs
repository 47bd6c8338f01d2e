//! Domain types for ancestor tree construction.
//!
//! Person records arrive from the gateway as loosely shaped JSON
//! ([`RawPersonRecord`]) and are validated into [`PersonRecord`] before the
//! traversal ever sees them.

use crate::error::{Error, Result};
use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Name used when a record has no usable first name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A standalone run of four digits inside free-text date strings.
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("year pattern is a valid regex"));

/// Opaque, stable identifier for a person.
///
/// Record sources may use integer keys; those are accepted on input and kept
/// as their decimal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PersonId(pub String);

impl PersonId {
    /// Create a new person ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PersonId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for PersonId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Key text that may be written as a JSON string or integer.
struct KeyText(String);

impl<'de> Deserialize<'de> for KeyText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = KeyText;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<KeyText, E> {
                Ok(KeyText(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<KeyText, E> {
                Ok(KeyText(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<KeyText, E> {
                Ok(KeyText(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

impl<'de> Deserialize<'de> for PersonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        KeyText::deserialize(deserializer).map(|key| PersonId(key.0))
    }
}

fn deserialize_optional_key<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<KeyText>::deserialize(deserializer)?.map(|key| key.0))
}

/// Recorded sex of a person
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// Male
    #[serde(rename = "M")]
    Male,

    /// Female
    #[serde(rename = "F")]
    Female,

    /// Not recorded or not recognized
    #[default]
    #[serde(rename = "U")]
    Unknown,
}

impl Sex {
    /// Parse the loose sex codes used by record sources.
    ///
    /// `M`/`male` and `F`/`female` are recognized case-insensitively;
    /// anything else is [`Sex::Unknown`].
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Sex::Male,
            "f" | "female" => Sex::Female,
            _ => Sex::Unknown,
        }
    }

    /// Single-letter code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Unknown => "U",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A birth or death event attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeEvent {
    /// Free-text date (e.g. "ABT 1850", "12 MAR 1901")
    #[serde(default)]
    pub date: Option<String>,

    /// Free-text place
    #[serde(default)]
    pub place: Option<String>,
}

impl LifeEvent {
    /// The first standalone four-digit year in the date text, if any.
    pub fn year(&self) -> Option<u16> {
        let date = self.date.as_deref()?;
        YEAR_PATTERN
            .captures(date)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Reference from a record to one of its parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    /// ID of the parent
    pub id: PersonId,

    /// Parent display name as denormalized by the source
    #[serde(default)]
    pub name: Option<String>,
}

impl ParentRef {
    /// Create a parent reference
    pub fn new(id: impl Into<PersonId>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Person record as delivered by a record source, before validation.
///
/// Field names follow the source API (`first_name`, `births`, ...). Every
/// field except `id` may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPersonRecord {
    /// Record ID
    pub id: PersonId,

    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,

    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,

    /// Loose sex code ("M", "F", "male", ...)
    #[serde(default)]
    pub sex: Option<String>,

    /// Birth events, most authoritative first
    #[serde(default)]
    pub births: Vec<LifeEvent>,

    /// Death events, most authoritative first
    #[serde(default)]
    pub deaths: Vec<LifeEvent>,

    /// Parents in source order
    #[serde(default)]
    pub parents: Vec<ParentRef>,

    /// Portrait media reference
    #[serde(default, deserialize_with = "deserialize_optional_key")]
    pub profile_image_id: Option<String>,

    /// Summary birth year kept by some sources alongside the events
    #[serde(default)]
    pub birth_year: Option<i32>,
}

/// Validated, immutable person snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    /// Record ID
    pub id: PersonId,

    /// Given name
    pub first_name: Option<String>,

    /// Family name
    pub last_name: Option<String>,

    /// Recorded sex
    pub sex: Sex,

    /// Birth events, most authoritative first
    pub births: Vec<LifeEvent>,

    /// Death events, most authoritative first
    pub deaths: Vec<LifeEvent>,

    /// Parents in source order, unique by ID
    pub parents: Vec<ParentRef>,

    /// Portrait media reference
    pub profile_image_id: Option<String>,

    /// Summary birth year
    pub birth_year: Option<i32>,
}

impl PersonRecord {
    /// Create a record with just an ID and name.
    pub fn new(id: impl Into<PersonId>, first_name: &str, last_name: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            id: id.into(),
            first_name: non_empty(first_name),
            last_name: non_empty(last_name),
            sex: Sex::Unknown,
            births: Vec::new(),
            deaths: Vec::new(),
            parents: Vec::new(),
            profile_image_id: None,
            birth_year: None,
        }
    }

    /// Display name: `"{first} {last}"`, trimmed.
    ///
    /// A missing or blank first name becomes [`UNKNOWN_NAME`]; a missing last
    /// name is left out.
    pub fn display_name(&self) -> String {
        let first = self
            .first_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_NAME);
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }

    /// Birth year from the first birth event, else the summary year.
    pub fn display_birth_year(&self) -> Option<u16> {
        self.births
            .first()
            .and_then(LifeEvent::year)
            .or_else(|| self.birth_year.and_then(|y| u16::try_from(y).ok()))
    }

    /// Death year from the first death event.
    pub fn display_death_year(&self) -> Option<u16> {
        self.deaths.first().and_then(LifeEvent::year)
    }

    /// Whether `id` is listed as a parent of this person.
    pub fn has_parent(&self, id: &PersonId) -> bool {
        self.parents.iter().any(|p| &p.id == id)
    }
}

impl TryFrom<RawPersonRecord> for PersonRecord {
    type Error = Error;

    fn try_from(raw: RawPersonRecord) -> Result<Self> {
        if raw.id.as_str().trim().is_empty() {
            return Err(Error::InvalidRecord("record has an empty id".to_string()));
        }

        let mut seen = HashSet::new();
        let mut parents = Vec::with_capacity(raw.parents.len());
        for parent in raw.parents {
            if parent.id.as_str().trim().is_empty() {
                tracing::debug!(person = %raw.id, "Dropping parent reference with empty id");
                continue;
            }
            if seen.insert(parent.id.clone()) {
                parents.push(parent);
            } else {
                tracing::debug!(person = %raw.id, parent = %parent.id, "Dropping duplicate parent reference");
            }
        }

        Ok(Self {
            id: raw.id,
            first_name: raw.first_name,
            last_name: raw.last_name,
            sex: raw.sex.as_deref().map_or(Sex::Unknown, Sex::parse),
            births: raw.births,
            deaths: raw.deaths,
            parents,
            profile_image_id: raw.profile_image_id,
            birth_year: raw.birth_year,
        })
    }
}

impl From<PersonRecord> for RawPersonRecord {
    fn from(record: PersonRecord) -> Self {
        Self {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            sex: Some(record.sex.code().to_string()),
            births: record.births,
            deaths: record.deaths,
            parents: record.parents,
            profile_image_id: record.profile_image_id,
            birth_year: record.birth_year,
        }
    }
}

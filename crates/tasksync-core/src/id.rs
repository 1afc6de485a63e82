use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Invalid id: {0}")]
    Invalid(String),
}

/// Entity identifier as the sync service represents it.
///
/// Two disjoint forms exist: real ids are decimal integers assigned by the
/// server, temp ids are UUIDs minted locally for entities the server has not
/// confirmed yet. The empty value (and `"0"`) stands for "no id".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    /// Numeric ids are stored in canonical form, so `"0"` becomes the empty
    /// id and `"007"` becomes `"7"`, matching what the wire form reads back.
    pub fn new(text: &str) -> Result<Self, IdError> {
        if let Ok(value) = text.parse::<i64>() {
            if value == 0 {
                return Ok(Self::default());
            }
            return Ok(Self(value.to_string()));
        }
        if is_temp_id(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(IdError::Invalid(text.to_string()))
        }
    }

    /// Validates every value; fails on the first malformed one.
    pub fn parse_many<S: AsRef<str>>(values: &[S]) -> Result<Vec<Self>, IdError> {
        values.iter().map(|value| Self::new(value.as_ref())).collect()
    }

    pub fn generate_temp() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_temp(&self) -> bool {
        is_temp_id(&self.0)
    }

    pub fn is_valid(&self) -> bool {
        is_valid_id(&self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty() || self.0 == "0"
    }
}

pub fn is_valid_id(text: &str) -> bool {
    text.parse::<i64>().is_ok() || is_temp_id(text)
}

pub fn is_temp_id(text: &str) -> bool {
    Uuid::parse_str(text).is_ok()
}

/// Fresh idempotency token for a queued command.
pub fn new_uuid() -> Uuid {
    Uuid::new_v4()
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_zero() {
            return serializer.serialize_none();
        }
        if self.is_temp() {
            return serializer.serialize_str(&self.0);
        }
        match self.0.parse::<i64>() {
            Ok(value) => serializer.serialize_i64(value),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer id, a uuid string, or null")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Id, E> {
        if value == 0 {
            return Ok(Id::default());
        }
        Ok(Id(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Id, E> {
        if value == 0 {
            return Ok(Id::default());
        }
        Ok(Id(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Id, E> {
        if value.is_empty() || value == "0" {
            return Ok(Id::default());
        }
        Id::new(value).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Id, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

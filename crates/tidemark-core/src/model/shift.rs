//! Rank movement between the previous and the latest observation.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How an entity's leaderboard position changed since the prior observation.
///
/// Serialized as a bare signed integer (`previous rank − current rank`, so
/// positive means the entity moved up) or the string sentinel `"new"` for an
/// entity with no prior observation. Entities that dropped out of the current
/// observation set get no entry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankShift {
    Moved(i64),
    New,
}

impl Serialize for RankShift {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Moved(delta) => serializer.serialize_i64(*delta),
            Self::New => serializer.serialize_str("new"),
        }
    }
}

struct RankShiftVisitor;

impl Visitor<'_> for RankShiftVisitor {
    type Value = RankShift;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a signed integer or the string \"new\"")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(RankShift::Moved(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        i64::try_from(value)
            .map(RankShift::Moved)
            .map_err(|_| E::custom(format!("rank shift {value} out of range")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        if value == "new" {
            Ok(RankShift::New)
        } else {
            Err(E::custom(format!("unknown rank shift sentinel {value:?}")))
        }
    }
}

impl<'de> Deserialize<'de> for RankShift {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RankShiftVisitor)
    }
}

//! Mapping mode selection
//!
//! A mapping mode names the output-schema convention used when turning OTLP
//! signals into documents. The set is closed: anything else is rejected when
//! the exporter is configured, never defaulted at encode time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Output-schema convention for encoded documents.
///
/// Discriminants are the stable numeric codes reported in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(i32)]
pub enum MappingMode {
    /// Legacy layout with `Attributes.`/`Events.` prefixes
    #[default]
    None = 0,
    /// Elastic Common Schema
    Ecs = 1,
    /// Native OpenTelemetry schema
    Otel = 2,
    /// Legacy layout with attributes at the top level
    Raw = 3,
    /// Log body map serialized as the whole document
    BodyMap = 4,
}

impl MappingMode {
    pub const ALL: [MappingMode; 5] = [
        MappingMode::None,
        MappingMode::Ecs,
        MappingMode::Otel,
        MappingMode::Raw,
        MappingMode::BodyMap,
    ];

    /// Lowercase configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMode::None => "none",
            MappingMode::Ecs => "ecs",
            MappingMode::Otel => "otel",
            MappingMode::Raw => "raw",
            MappingMode::BodyMap => "bodymap",
        }
    }

    /// Numeric code of the mode
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingMode {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "no" => Ok(MappingMode::None),
            "ecs" => Ok(MappingMode::Ecs),
            "otel" => Ok(MappingMode::Otel),
            "raw" => Ok(MappingMode::Raw),
            "bodymap" => Ok(MappingMode::BodyMap),
            _ => Err(EncodeError::UnknownMappingMode {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MappingMode {
    type Error = EncodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<i32> for MappingMode {
    type Error = EncodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        MappingMode::ALL
            .into_iter()
            .find(|mode| mode.code() == value)
            .ok_or_else(|| EncodeError::UnknownMappingMode {
                value: value.to_string(),
            })
    }
}

impl From<MappingMode> for String {
    fn from(mode: MappingMode) -> Self {
        mode.as_str().to_string()
    }
}

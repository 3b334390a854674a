//! Sandbox summaries and privacy levels.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use sandpit_api::types::SandboxRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who can see a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Privacy {
    /// Wire code: 0 = public, 1 = unlisted, 2 = private.
    pub fn to_number(self) -> u8 {
        match self {
            Self::Public => 0,
            Self::Unlisted => 1,
            Self::Private => 2,
        }
    }

    /// Decode a wire code.
    pub fn from_number(number: i64) -> Result<Self> {
        match number {
            0 => Ok(Self::Public),
            1 => Ok(Self::Unlisted),
            2 => Ok(Self::Private),
            other => Err(CoreError::InvalidPrivacy(other)),
        }
    }
}

impl TryFrom<i64> for Privacy {
    type Error = CoreError;

    fn try_from(number: i64) -> Result<Self> {
        Self::from_number(number)
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Unlisted => write!(f, "unlisted"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Snapshot of a sandbox as reported by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub privacy: Privacy,
    pub tags: Vec<String>,
}

impl TryFrom<SandboxRecord> for SandboxInfo {
    type Error = CoreError;

    fn try_from(record: SandboxRecord) -> Result<Self> {
        Ok(Self {
            created_at: parse_timestamp(&record.created_at)?,
            updated_at: parse_timestamp(&record.updated_at)?,
            privacy: Privacy::from_number(record.privacy)?,
            id: record.id,
            title: record.title,
            description: record.description,
            tags: record.tags,
        })
    }
}

/// Parse an RFC 3339 timestamp from the control plane.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CoreError::Protocol(format!("invalid timestamp {value:?}: {e}")))
}

//! Holder identity type with `tlk_` prefix.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An account identity that owns token balance, always prefixed with `tlk_`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HolderId(String);

impl HolderId {
    /// The standard prefix for all holder ids.
    pub const PREFIX: &'static str = "tlk_";

    /// Id of the staking registry's custody account unless configured otherwise.
    pub const DEFAULT_CUSTODY: &'static str = "tlk_staking_custody";

    /// Parse and validate a holder id.
    ///
    /// The body after the prefix must be non-empty and consist of ASCII
    /// alphanumerics or `_`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        let body = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypeError::InvalidHolder(format!("{s}: missing {} prefix", Self::PREFIX)))?;
        if body.is_empty() {
            return Err(TypeError::InvalidHolder(format!("{s}: empty body")));
        }
        if !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TypeError::InvalidHolder(format!("{s}: illegal character")));
        }
        Ok(Self(s))
    }

    /// The default custody account id.
    pub fn default_custody() -> Self {
        Self(Self::DEFAULT_CUSTODY.to_string())
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HolderId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HolderId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<HolderId> for String {
    fn from(id: HolderId) -> Self {
        id.0
    }
}

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::Error;

const MAX_LEN: usize = 256;

/// A subscriber supplied email-address, stored trimmed and lowercased
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Trim and lowercase a raw address without validating it
    pub fn normalize(value: &str) -> String {
        value.trim().to_lowercase()
    }
}

impl FromStr for EmailAddress {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
        }

        let value = Self::normalize(value);

        if value.is_empty() {
            return Err(Error::ParsingError("Email required".into()));
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err(Error::ParsingError("Email address too long".into()));
        }
        if !EMAIL_REGEX.is_match(&value) {
            return Err(Error::ParsingError("Invalid email".into()));
        }

        Ok(Self(value))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

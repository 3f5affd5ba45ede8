use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;

/// Calendar month, named by its three letter abbreviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Self::Jan,
        Self::Feb,
        Self::Mar,
        Self::Apr,
        Self::May,
        Self::Jun,
        Self::Jul,
        Self::Aug,
        Self::Sep,
        Self::Oct,
        Self::Nov,
        Self::Dec,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::Jan => "Jan",
            Self::Feb => "Feb",
            Self::Mar => "Mar",
            Self::Apr => "Apr",
            Self::May => "May",
            Self::Jun => "Jun",
            Self::Jul => "Jul",
            Self::Aug => "Aug",
            Self::Sep => "Sep",
            Self::Oct => "Oct",
            Self::Nov => "Nov",
            Self::Dec => "Dec",
        }
    }

    /// Months mentioned in a free text date descriptor such as "Nov–Dec" or "Feb 10–20"
    pub fn extract(dates: &str) -> BTreeSet<Month> {
        lazy_static::lazy_static! {
            static ref MONTH_REGEX: Regex = Regex::new(
                r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\b"
            ).unwrap();
        }

        MONTH_REGEX
            .find_iter(dates)
            .filter_map(|m| m.as_str().parse().ok())
            .collect()
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|month| month.abbreviation().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("'{}' is not a month abbreviation", value))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

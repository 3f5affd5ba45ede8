use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TripType {
    #[default]
    Return,
    OneWay,
}

impl TripType {
    /// Lenient parse for extracted data, where anything unrecognised is a return trip
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "" | "return" | "round-trip" | "roundtrip" => Ok(Self::Return),
            "one-way" | "oneway" | "one way" => Ok(Self::OneWay),
            other => Err(format!("must be 'return' or 'one-way', got '{}'", other)),
        }
    }
}

impl AsRef<str> for TripType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Return => "return",
            Self::OneWay => "one-way",
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

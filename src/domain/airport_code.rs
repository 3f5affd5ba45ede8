use std::fmt;
use std::str::FromStr;

/// A three letter IATA airport code, always uppercase
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct AirportCode(String);

impl AirportCode {
    /// Human friendly name for the UK departure airports we know about,
    /// falling back to the code itself
    pub fn display_name(&self) -> &str {
        match self.0.as_str() {
            "LHR" => "London Heathrow",
            "LGW" => "London Gatwick",
            "LCY" => "London City",
            "LTN" => "London Luton",
            "STN" => "London Stansted",
            "SEN" => "London Southend",
            "MAN" => "Manchester",
            "BHX" => "Birmingham",
            "EDI" => "Edinburgh",
            "GLA" => "Glasgow",
            "ABZ" => "Aberdeen",
            "INV" => "Inverness",
            "NCL" => "Newcastle",
            "LPL" => "Liverpool",
            "BRS" => "Bristol",
            "BOH" => "Bournemouth",
            "SOU" => "Southampton",
            "EMA" => "East Midlands",
            "EXT" => "Exeter",
            "CWL" => "Cardiff",
            "BFS" => "Belfast International",
            "BHD" => "Belfast City",
            "DSA" => "Doncaster Sheffield",
            other => other,
        }
    }
}

impl FromStr for AirportCode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_uppercase();

        if value.is_empty() {
            return Err("required".into());
        }
        if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("must be a 3-letter airport code".into());
        }

        Ok(Self(value))
    }
}

impl AsRef<str> for AirportCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

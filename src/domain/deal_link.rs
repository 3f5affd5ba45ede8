use std::fmt;
use std::str::FromStr;

use url::Url;

/// An absolute http(s) link to a deal page
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DealLink(Url);

impl DealLink {
    /// Hostname without a leading `www.`
    pub fn host(&self) -> Option<&str> {
        self.0
            .host_str()
            .map(|host| host.strip_prefix("www.").unwrap_or(host))
    }

    /// The deal link tagged with email campaign parameters
    pub fn tracked(&self, campaign: &str) -> Url {
        let mut url = self.0.clone();
        url.query_pairs_mut()
            .append_pair("utm_source", "email")
            .append_pair("utm_medium", "alert")
            .append_pair("utm_campaign", campaign);
        url
    }
}

impl FromStr for DealLink {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("required".into());
        }

        let url = Url::parse(value).map_err(|_| "must be a valid http(s) URL".to_string())?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(Self(url)),
            _ => Err("must be a valid http(s) URL".into()),
        }
    }
}

impl AsRef<str> for DealLink {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DealLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

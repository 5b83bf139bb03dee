use anyhow::{Context, Error, Result};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use url::Url;
use urlencoding::decode;

/// Connection settings parsed from a URL: `<driver>:<location>[?key=value&...]`.
///
/// ```rust
/// use tabula_core::ConnectionUrl;
/// let url: ConnectionUrl = "sqlite:///var/data/app.db?mode=rwc".parse().unwrap();
/// assert_eq!(url.driver, "sqlite");
/// assert_eq!(url.location, "/var/data/app.db");
/// assert_eq!(url.param("mode"), Some("rwc"));
/// let memory: ConnectionUrl = "sqlite::memory:".parse().unwrap();
/// assert!(memory.is_memory());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl {
    /// URL scheme, the name of the driver expected to handle it.
    pub driver: String,
    /// Host and path, percent-decoded.
    pub location: String,
    /// Query parameters, in order.
    pub params: Vec<(String, String)>,
}

impl ConnectionUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let context = || format!("While parsing the connection URL `{}`", url);
        let parsed = Url::parse(url).with_context(context)?;
        let mut location = String::new();
        if let Some(host) = parsed.host_str() {
            location.push_str(host);
        }
        location.push_str(&decode(parsed.path()).with_context(context)?);
        let params = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self {
            driver: parsed.scheme().to_string(),
            location,
            params,
        })
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_memory(&self) -> bool {
        self.location.is_empty() || self.location == ":memory:"
    }

    /// Fails unless the URL is meant for `driver`.
    pub fn expect_driver(&self, driver: &str) -> Result<&Self> {
        if self.driver != driver {
            return Err(Error::msg(format!(
                "Expected a `{driver}` connection URL, found scheme `{}`",
                self.driver
            )));
        }
        Ok(self)
    }
}

impl FromStr for ConnectionUrl {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for ConnectionUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.driver)?;
        if self.location.starts_with('/') {
            f.write_str("//")?;
        }
        f.write_str(&self.location)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            write!(f, "{}={}", urlencoding::encode(k), urlencoding::encode(v))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionUrl;

    #[test]
    fn file_urls() {
        let url = ConnectionUrl::parse("sqlite:///tmp/my%20db.sqlite?mode=ro&cache=shared").unwrap();
        assert_eq!(url.driver, "sqlite");
        assert_eq!(url.location, "/tmp/my db.sqlite");
        assert_eq!(url.param("mode"), Some("ro"));
        assert_eq!(url.param("cache"), Some("shared"));
        assert_eq!(url.param("missing"), None);
        assert!(!url.is_memory());
        assert!(url.expect_driver("sqlite").is_ok());
        assert!(url.expect_driver("postgres").is_err());
    }

    #[test]
    fn memory_url() {
        let url = ConnectionUrl::parse("sqlite::memory:").unwrap();
        assert_eq!(url.location, ":memory:");
        assert!(url.is_memory());
        assert_eq!(url.to_string(), "sqlite::memory:");
    }

    #[test]
    fn invalid_url() {
        assert!(ConnectionUrl::parse("not a url").is_err());
    }
}

//! Internal / public endpoint pair

use std::fmt;
use url::Url;

use crate::s3::error::{Result, StorageError};

/// A base URL reduced to what requests and signatures need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    /// Host without port, lower-cased
    host: String,
    /// Host header value: host plus any non-default port
    authority: String,
}

impl Endpoint {
    /// Parse `host[:port]` or a full `scheme://host[:port]` URL.
    ///
    /// Bare hosts take their scheme from `use_ssl`. Default ports
    /// (`:443` for https, `:80` for http) are dropped so the signed `host`
    /// matches what a browser sends.
    pub fn parse(raw: &str, use_ssl: bool) -> Result<Self> {
        let raw = raw.trim().trim_end_matches('/');
        if raw.is_empty() {
            return Err(StorageError::InvalidUrl("endpoint is empty".to_string()));
        }

        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            let scheme = if use_ssl { "https" } else { "http" };
            format!("{}://{}", scheme, raw)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| StorageError::InvalidUrl(format!("{}: {}", raw, e)))?;
        Self::from_url(&url)
    }

    /// Take scheme, host and port from a parsed URL
    pub fn from_url(url: &Url) -> Result<Self> {
        let scheme = url.scheme().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(StorageError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                scheme
            )));
        }

        // Requests and signatures address `/{bucket}/{key}` from the root
        if !matches!(url.path(), "" | "/") || url.query().is_some() {
            return Err(StorageError::InvalidUrl(format!(
                "{} must not carry a path or query",
                url
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StorageError::InvalidUrl(format!("{} has no host", url)))?
            .to_ascii_lowercase();

        // Url::port() already omits the scheme's default port
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };

        Ok(Self {
            scheme,
            host,
            authority,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Absolute URL for a path that starts with `/`
    pub fn url_for(&self, path_and_query: &str) -> String {
        let mut url =
            String::with_capacity(self.scheme.len() + 3 + self.authority.len() + path_and_query.len() + 1);
        url.push_str(&self.scheme);
        url.push_str("://");
        url.push_str(&self.authority);
        if !path_and_query.starts_with('/') {
            url.push('/');
        }
        url.push_str(path_and_query);
        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// Internal endpoint plus the optional browser-facing one
#[derive(Debug, Clone)]
pub struct EndpointPair {
    pub internal: Endpoint,
    pub public: Option<Endpoint>,
}

impl EndpointPair {
    pub fn new(internal: Endpoint, public: Option<Endpoint>) -> Self {
        Self { internal, public }
    }

    /// Parse both endpoints; the public one defaults to https when bare
    pub fn parse(internal: &str, public: Option<&str>, use_ssl: bool) -> Result<Self> {
        let internal = Endpoint::parse(internal, use_ssl)?;
        let public = match public.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(Endpoint::parse(raw, true)?),
            None => None,
        };
        Ok(Self { internal, public })
    }
}

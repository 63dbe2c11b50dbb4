//! Proxy configuration

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use url::{Position, Url};

/// Proxy configuration applied to runners and to the image build
///
/// Constructed through [`ProxyConfig::new`], [`ProxyConfig::parse`] or
/// deserialization; all reject `use_aproxy` without an `http` or `https`
/// proxy. Ports written explicitly are kept even when they are the scheme
/// default, which `Url` normalizes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProxyConfig", into = "RawProxyConfig")]
pub struct ProxyConfig {
    http: Option<Url>,
    http_port: Option<u16>,
    https: Option<Url>,
    https_port: Option<u16>,
    no_proxy: Option<String>,
    use_aproxy: bool,
}

/// Unvalidated wire form of [`ProxyConfig`]
///
/// Empty strings mean unset, as with [`ProxyConfig::parse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProxyConfig {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
    #[serde(default)]
    pub no_proxy: Option<String>,
    #[serde(default)]
    pub use_aproxy: bool,
}

impl ProxyConfig {
    pub fn new(
        http: Option<Url>,
        https: Option<Url>,
        no_proxy: Option<String>,
        use_aproxy: bool,
    ) -> Result<Self> {
        Self::build(
            http.map(|url| (url.port(), url)),
            https.map(|url| (url.port(), url)),
            no_proxy,
            use_aproxy,
        )
    }

    fn build(
        http: Option<(Option<u16>, Url)>,
        https: Option<(Option<u16>, Url)>,
        no_proxy: Option<String>,
        use_aproxy: bool,
    ) -> Result<Self> {
        for (_, url) in http.iter().chain(https.iter()) {
            check_proxy_url(url)?;
        }

        if use_aproxy && http.is_none() && https.is_none() {
            return Err(ConfigError::InvalidProxy(
                "aproxy requires http or https to be set".to_string(),
            ));
        }

        let (http_port, http) = http.unzip();
        let (https_port, https) = https.unzip();
        Ok(Self {
            http,
            http_port: http_port.flatten(),
            https,
            https_port: https_port.flatten(),
            no_proxy: no_proxy.filter(|s| !s.trim().is_empty()),
            use_aproxy,
        })
    }

    /// Parse proxy URLs from strings, treating empty strings as unset
    pub fn parse(
        http: Option<&str>,
        https: Option<&str>,
        no_proxy: Option<&str>,
        use_aproxy: bool,
    ) -> Result<Self> {
        Self::build(
            parse_optional_url(http)?,
            parse_optional_url(https)?,
            no_proxy.map(str::to_string),
            use_aproxy,
        )
    }

    pub fn http(&self) -> Option<&Url> {
        self.http.as_ref()
    }

    pub fn https(&self) -> Option<&Url> {
        self.https.as_ref()
    }

    pub fn no_proxy(&self) -> Option<&str> {
        self.no_proxy.as_deref()
    }

    pub fn use_aproxy(&self) -> bool {
        self.use_aproxy
    }

    /// `http` as written in environment variables, empty when unset
    pub fn http_string(&self) -> String {
        self.http
            .as_ref()
            .map(|url| proxy_url_string(url, self.http_port))
            .unwrap_or_default()
    }

    /// `https` as written in environment variables, empty when unset
    pub fn https_string(&self) -> String {
        self.https
            .as_ref()
            .map(|url| proxy_url_string(url, self.https_port))
            .unwrap_or_default()
    }

    /// Whether a proxy is configured at all
    ///
    /// A config with only `no_proxy` set is not a proxy configuration.
    pub fn is_set(&self) -> bool {
        self.http.is_some() || self.https.is_some()
    }

    /// `host[:port]` of the proxy aproxy forwards to, if aproxy is enabled
    pub fn aproxy_address(&self) -> Option<String> {
        if !self.use_aproxy {
            return None;
        }

        let (proxy, port) = match &self.http {
            Some(url) => (url, self.http_port),
            None => (self.https.as_ref()?, self.https_port),
        };
        let host = proxy.host_str()?;
        Some(match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// The config if it actually sets a proxy, `None` otherwise
    pub fn effective(proxy: Option<&ProxyConfig>) -> Option<&ProxyConfig> {
        proxy.filter(|p| p.is_set())
    }
}

impl TryFrom<RawProxyConfig> for ProxyConfig {
    type Error = ConfigError;

    fn try_from(raw: RawProxyConfig) -> Result<Self> {
        Self::parse(
            raw.http.as_deref(),
            raw.https.as_deref(),
            raw.no_proxy.as_deref(),
            raw.use_aproxy,
        )
    }
}

impl From<ProxyConfig> for RawProxyConfig {
    fn from(config: ProxyConfig) -> Self {
        Self {
            http: config
                .http
                .as_ref()
                .map(|url| url_with_port(url, config.http_port)),
            https: config
                .https
                .as_ref()
                .map(|url| url_with_port(url, config.https_port)),
            no_proxy: config.no_proxy,
            use_aproxy: config.use_aproxy,
        }
    }
}

fn check_proxy_url(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidProxy(format!(
            "proxy URL must use http or https: {}",
            url
        )));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidProxy(format!(
            "proxy URL has no host: {}",
            url
        )));
    }
    Ok(())
}

/// `url` with `port` written out, even when it is the scheme default
fn url_with_port(url: &Url, port: Option<u16>) -> String {
    match port {
        Some(port) if url.port().is_none() => format!(
            "{}:{}{}",
            &url[..Position::AfterHost],
            port,
            &url[Position::AfterHost..]
        ),
        _ => url.to_string(),
    }
}

/// Proxy URL without the root path `Url` adds (`http://host:3128/`)
fn proxy_url_string(url: &Url, port: Option<u16>) -> String {
    let full = url_with_port(url, port);
    if url.path() == "/" && url.query().is_none() && url.fragment().is_none() {
        full.trim_end_matches('/').to_string()
    } else {
        full
    }
}

/// Port as written in the authority of `raw`
fn explicit_port(raw: &str) -> Option<u16> {
    let (_, rest) = raw.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let (host, port) = host_port.rsplit_once(':')?;
    if host.starts_with('[') && !host.ends_with(']') {
        return None;
    }
    port.parse().ok()
}

fn parse_optional_url(value: Option<&str>) -> Result<Option<(Option<u16>, Url)>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            let url =
                Url::parse(s).map_err(|e| ConfigError::InvalidProxy(format!("{}: {}", s, e)))?;
            Ok(Some((url.port().or_else(|| explicit_port(s)), url)))
        }
    }
}

//! HTTP(S) probing of a single host:port against the loaded [`ProbeSpec`].
use crate::matcher::Pattern;
use crate::probe::{Method, ProbeSpec};
use crate::types::Outcome;
use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Split an optional `http://` / `https://` prefix off a host.
    pub fn split_host(host: &str) -> (Option<Scheme>, &str) {
        if let Some(rest) = host.strip_prefix("https://") {
            (Some(Scheme::Https), rest)
        } else if let Some(rest) = host.strip_prefix("http://") {
            (Some(Scheme::Http), rest)
        } else {
            (None, host)
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which auto-scheme mode tries the two schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemeOrder {
    #[default]
    HttpFirst,
    HttpsFirst,
}

impl SchemeOrder {
    pub fn schemes(self) -> [Scheme; 2] {
        match self {
            SchemeOrder::HttpFirst => [Scheme::Http, Scheme::Https],
            SchemeOrder::HttpsFirst => [Scheme::Https, Scheme::Http],
        }
    }
}

/// Format `host:port`, bracketing bare IPv6 literals.
pub fn authority(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Sends the configured request and classifies the answer.
///
/// One instance is shared by all workers; the underlying [`Client`] pools
/// connections internally.
///
/// Certificate and hostname validation are disabled for HTTPS: scan targets
/// are arbitrary devices with self-signed certificates. Do not reuse this
/// client against endpoints you need to trust.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    spec: Arc<ProbeSpec>,
    headers: HeaderMap,
    pattern: Pattern,
    path: String,
}

impl HttpProber {
    /// `timeout` bounds the whole exchange: connect, TLS, response and body.
    pub fn new(spec: Arc<ProbeSpec>, timeout: Duration) -> Result<Self> {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .context("failed to build TLS connector")?;
        let client = Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        let headers = spec.header_map()?;
        let pattern = Pattern::compile(&spec.search);
        let path = spec.normalized_path();

        Ok(Self {
            client,
            spec,
            headers,
            pattern,
            path,
        })
    }

    pub fn spec(&self) -> &ProbeSpec {
        &self.spec
    }

    /// `scheme://host:port/path`, plus `?data` for GET when data is non-empty.
    pub fn url(&self, scheme: Scheme, host: &str, port: &str) -> String {
        let mut url = format!("{scheme}://{}{}", authority(host, port), self.path);
        if self.spec.method == Method::Get && !self.spec.data.is_empty() {
            url.push('?');
            url.push_str(&self.spec.data);
        }
        url
    }

    /// Probe once with a fixed scheme.
    pub async fn probe(&self, scheme: Scheme, host: &str, port: &str) -> Outcome {
        let method = match &self.spec.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Other(_) => return Outcome::WrongMethod,
        };

        let url = self.url(scheme, host, port);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers.clone());
        if method == reqwest::Method::POST {
            req = req.body(self.spec.data.clone());
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "request failed");
                return Outcome::NoResponse(e.to_string());
            }
        };

        let status = resp.status();
        if status != StatusCode::OK {
            debug!(%url, %status, "unexpected status");
            return Outcome::WrongResponse(status.as_u16());
        }

        match resp.text().await {
            Ok(body) if self.pattern.is_match(&body) => Outcome::Success,
            Ok(_) => Outcome::NotDetected,
            Err(e) => Outcome::NoResponse(e.to_string()),
        }
    }

    /// Try each scheme in order, stopping at the first detection.
    /// Reports the last attempted outcome when nothing is detected.
    pub async fn probe_schemes(&self, schemes: &[Scheme], host: &str, port: &str) -> Outcome {
        let mut last = Outcome::NoResponse("no scheme attempted".into());
        for &scheme in schemes {
            last = self.probe(scheme, host, port).await;
            if last.is_detection() {
                break;
            }
        }
        last
    }
}

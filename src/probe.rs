//! The JSON probe descriptor: which request to send and what to look for.
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Request method named by the descriptor. Only GET and POST are supported;
/// anything else is carried verbatim so it can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        match s.as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other(s),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProbeSpecError {
    #[error("unsupported method {0:?} (expected GET or POST)")]
    UnsupportedMethod(String),
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

/// Loaded once at startup and shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeSpec {
    pub path: String,
    pub method: Method,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub search: String,
    /// POST body, or query string for GET.
    #[serde(default)]
    pub data: String,
}

impl ProbeSpec {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("malformed probe descriptor")
    }

    /// Load a descriptor from a JSON file. Errors if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed to read probe descriptor: {}", path.as_ref().display())
        })?;
        Self::from_json_str(&content)
            .with_context(|| format!("in {}", path.as_ref().display()))
    }

    /// Reject descriptors that could never produce a valid request.
    pub fn validate(&self) -> Result<(), ProbeSpecError> {
        if let Method::Other(m) = &self.method {
            return Err(ProbeSpecError::UnsupportedMethod(m.clone()));
        }
        self.header_map().map(|_| ())
    }

    pub fn header_map(&self) -> Result<HeaderMap, ProbeSpecError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let n = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ProbeSpecError::InvalidHeaderName(name.clone()))?;
            let v = HeaderValue::from_str(value)
                .map_err(|_| ProbeSpecError::InvalidHeaderValue(name.clone()))?;
            map.append(n, v);
        }
        Ok(map)
    }

    /// Request path with a guaranteed leading `/`.
    pub fn normalized_path(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }
}

use std::fmt;

/// One host/port pair queued for probing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTask {
    pub host: String,
    pub port: String,
}

impl ScanTask {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }
}

/// How a single probe ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// TCP liveness check failed; no HTTP request was sent.
    Unreachable,
    /// Transport failure during the HTTP exchange (connect, TLS, timeout, body read).
    NoResponse(String),
    /// The server answered with a status other than 200.
    WrongResponse(u16),
    /// 200 response whose body did not match the search pattern.
    NotDetected,
    /// 200 response whose body matched the search pattern.
    Success,
    /// The descriptor names a method other than GET or POST.
    WrongMethod,
}

impl Outcome {
    pub fn is_detection(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unreachable => Ok(()),
            Outcome::NoResponse(detail) => write!(f, "[NO RESPONSE] => {detail}"),
            Outcome::WrongResponse(status) => write!(f, "[WRONG RESPONSE] {status}"),
            Outcome::NotDetected => f.write_str("[NOT DETECTED]"),
            Outcome::Success => f.write_str("[SUCCESS]"),
            Outcome::WrongMethod => f.write_str("[WRONG METHOD]"),
        }
    }
}

/// A finished probe, as forwarded to the result sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub worker_id: usize,
    pub host: String,
    pub port: String,
    pub outcome: Outcome,
}

impl fmt::Display for ScanResult {
    /// Renders `{<worker>}\t<host>\t<port>\t<outcome>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}\t{}\t{}\t{}",
            self.worker_id, self.host, self.port, self.outcome
        )
    }
}

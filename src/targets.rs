//! Turns target-list lines into scan tasks.
use crate::types::ScanTask;
use anyhow::{Context, Result};
use ipnet::IpNet;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufReader;

/// Expands list lines against a fixed port set.
///
/// - `host,port` yields one task carrying that port.
/// - a bare `host` yields one task per configured port, in port-set order.
/// - a host written in CIDR notation is expanded to its host addresses first.
/// - empty lines and `#` comments yield nothing.
#[derive(Debug, Clone)]
pub struct TargetEnumerator {
    ports: Arc<[String]>,
}

impl TargetEnumerator {
    pub fn new(ports: &[u16]) -> Self {
        Self {
            ports: ports.iter().map(u16::to_string).collect(),
        }
    }

    pub fn has_ports(&self) -> bool {
        !self.ports.is_empty()
    }

    /// Lazily produce the tasks for one list line.
    pub fn tasks(&self, line: &str) -> impl Iterator<Item = ScanTask> + Send + 'static {
        let line = line.trim();
        let (host, ports): (&str, Arc<[String]>) = if line.is_empty() || line.starts_with('#') {
            ("", Arc::from(Vec::new()))
        } else {
            match split_explicit(line) {
                Some((host, port)) => (host, Arc::from(vec![port.to_owned()])),
                None => (line, Arc::clone(&self.ports)),
            }
        };

        expand_host(host).flat_map(move |h| {
            let ports = Arc::clone(&ports);
            (0..ports.len()).map(move |i| ScanTask::new(h.clone(), ports[i].clone()))
        })
    }
}

/// `host,port` with exactly two comma-separated fields.
fn split_explicit(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.split(',');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(host), Some(port), None) => Some((host.trim(), port.trim())),
        _ => None,
    }
}

/// A single host, or every host address of a CIDR network.
fn expand_host(host: &str) -> Box<dyn Iterator<Item = String> + Send> {
    if host.is_empty() {
        return Box::new(std::iter::empty());
    }
    if host.contains('/') {
        if let Ok(net) = host.parse::<IpNet>() {
            return Box::new(expand_cidr(net));
        }
    }
    Box::new(std::iter::once(host.to_owned()))
}

/// Host addresses of a network. IPv4 excludes network and broadcast
/// addresses except for /31 and /32.
pub fn expand_cidr(net: IpNet) -> impl Iterator<Item = String> + Send {
    net.hosts().map(|ip| ip.to_string())
}

/// Open the target list for line-by-line reading. Errors if the file cannot be opened.
pub async fn open_list(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    let file = File::open(path.as_ref())
        .await
        .with_context(|| format!("failed to open target list: {}", path.as_ref().display()))?;
    Ok(BufReader::new(file))
}

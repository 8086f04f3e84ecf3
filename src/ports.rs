use anyhow::{bail, Context, Result};

/// Expand an nmap-style port specification into the ports it names.
///
/// Supported tokens, separated by commas:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
///
/// Parsing is lenient: a malformed number becomes `0`, a range whose start is
/// greater than its end contributes nothing, and duplicates are kept in order.
/// An empty specification yields an empty list. Use [`validate_port_spec`] for
/// strict checking.
pub fn expand_ports(spec: &str) -> Vec<u16> {
    let mut out: Vec<u16> = Vec::new();
    if spec.trim().is_empty() {
        return out;
    }

    for token in spec.split(',') {
        let token = token.trim();
        if let Some((a, b)) = token.split_once('-') {
            // `1-2-3` reads as `1-2`
            let b = b.split('-').next().unwrap_or("");
            let start = lenient_port(a);
            let end = lenient_port(b);
            if start <= end {
                out.extend(start..=end);
            }
            continue;
        }
        out.push(lenient_port(token));
    }

    out
}

/// Check a port specification strictly, token by token.
///
/// Errors on empty tokens, non-numeric values, ports outside 1..=65535 and
/// ranges whose start is greater than their end.
pub fn validate_port_spec(spec: &str) -> Result<()> {
    if spec.trim().is_empty() {
        return Ok(());
    }

    for (idx, raw) in spec.split(',').enumerate() {
        let token_no = idx + 1;
        let token = raw.trim();
        if token.is_empty() {
            bail!("token {token_no}: empty port entry");
        }

        if let Some((a, b)) = token.split_once('-') {
            let start = parse_port_str(a.trim())
                .with_context(|| format!("token {token_no}: invalid start in range: {a}"))?;
            let end = parse_port_str(b.trim())
                .with_context(|| format!("token {token_no}: invalid end in range: {b}"))?;
            if start > end {
                bail!("token {token_no}: invalid range {start}-{end} (start > end)");
            }
            continue;
        }

        parse_port_str(token)
            .with_context(|| format!("token {token_no}: invalid port value: {token}"))?;
    }

    Ok(())
}

fn lenient_port(s: &str) -> u16 {
    s.trim().parse::<u16>().unwrap_or(0)
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

use crate::error::{Result, ScanError};
use url::Url;

/// Parse a target URL, accepting only absolute `http`/`https` URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;

    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    if parsed.scheme().is_empty() || !has_host {
        return Err(ScanError::InvalidUrl(format!(
            "{}: missing scheme or host",
            raw
        )));
    }

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ScanError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw, scheme
        ))),
    }
}

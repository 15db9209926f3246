//! Remote archive download.
//!
//! Archives too large for a browser upload are fetched server-side from a
//! direct-download URL. Validation happens before any connection is made:
//! only http/https, and never toward loopback or private address space.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use log::info;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;

#[derive(Debug, Clone)]
pub struct FetchLimits {
    pub max_bytes: u64,
    pub timeout: Duration,
}

impl FetchLimits {
    pub fn new(max_bytes: u64, timeout_secs: u64) -> Self {
        Self {
            max_bytes,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Checks scheme and destination address class of a user-supplied URL.
pub fn validate_url(url: &str) -> Result<reqwest::Url, FetchError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(FetchError::InvalidUrl(url.to_string())),
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
    if is_denied_host(host) {
        return Err(FetchError::DeniedAddress(host.to_string()));
    }

    Ok(parsed)
}

fn is_denied_host(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.eq_ignore_ascii_case("localhost") {
        return true;
    }
    match bare.parse::<IpAddr>() {
        Ok(ip) => is_denied_ip(&ip),
        Err(_) => false,
    }
}

fn is_denied_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            // fc00::/7 is the unique-local range.
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

/// Streams the archive to `dest`, enforcing the size cap as bytes arrive.
/// A failed or oversized download leaves no partial file behind.
pub async fn download(
    url: &reqwest::Url,
    dest: &Path,
    limits: &FetchLimits,
) -> Result<u64, FetchError> {
    match download_inner(url, dest, limits).await {
        Ok(size) => {
            info!("Downloaded {} ({} bytes)", dest.display(), size);
            Ok(size)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(dest).await;
            Err(e)
        }
    }
}

async fn download_inner(
    url: &reqwest::Url,
    dest: &Path,
    limits: &FetchLimits,
) -> Result<u64, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(limits.timeout)
        .build()
        .map_err(FetchError::Http)?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(map_reqwest)?
        .error_for_status()
        .map_err(map_reqwest)?;

    if let Some(length) = response.content_length() {
        if length > limits.max_bytes {
            return Err(FetchError::Oversize {
                limit: limits.max_bytes,
            });
        }
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

    let mut stream = response.bytes_stream();
    let mut total: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest)?;
        total += chunk.len() as u64;
        if total > limits.max_bytes {
            return Err(FetchError::Oversize {
                limit: limits.max_bytes,
            });
        }
        file.write_all(&chunk).await.map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
    }

    file.flush().await.map_err(|e| FetchError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(total)
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_public_https_url() {
        assert!(validate_url("https://example.com/archive.zip").is_ok());
        assert!(validate_url("http://example.com/archive.zip?token=x").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        for url in [
            "ftp://example.com/archive.zip",
            "file:///etc/passwd",
            "not a url",
        ] {
            assert!(
                matches!(validate_url(url), Err(FetchError::InvalidUrl(_))),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_rejects_loopback_and_private_hosts() {
        for url in [
            "http://localhost/archive.zip",
            "http://127.0.0.1/archive.zip",
            "http://10.0.0.8/archive.zip",
            "http://192.168.1.5:8080/archive.zip",
            "http://172.16.0.1/archive.zip",
            "http://169.254.1.1/archive.zip",
            "http://0.0.0.0/archive.zip",
            "http://[::1]/archive.zip",
            "http://[fc00::1]/archive.zip",
        ] {
            assert!(
                matches!(validate_url(url), Err(FetchError::DeniedAddress(_))),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_public_ip_allowed() {
        assert!(validate_url("http://93.184.216.34/archive.zip").is_ok());
        assert!(validate_url("http://[2001:db8::1]/archive.zip").is_ok());
    }
}

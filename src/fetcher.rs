use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;

/// Some station servers reject requests without a browser User-Agent
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Encodings tried in order when decoding a station page
const PAGE_ENCODINGS: &[&Encoding] = &[UTF_8, SHIFT_JIS, EUC_JP];

/// Best-effort single GET of a station page, no retries
#[derive(Clone)]
pub struct StationPageFetcher {
    client: reqwest::Client,
}

impl StationPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    #[instrument(skip(self))]
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!("Sending HTTP request to station page");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Retrieved page content, size: {} bytes", bytes.len());

        Ok(decode_page(&bytes))
    }
}

/// Decode page bytes as UTF-8, Shift_JIS or EUC-JP, whichever decodes
/// without malformed sequences first. Falls back to lossy UTF-8.
pub fn decode_page(bytes: &[u8]) -> String {
    for encoding in PAGE_ENCODINGS {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!("Decoded page as {}", encoding.name());
            return text.into_owned();
        }
    }

    warn!("Page is not valid in any expected encoding, decoding lossily");
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_page() {
        let html = "<table><tr><th>時刻</th></tr></table>";
        assert_eq!(decode_page(html.as_bytes()), html);
    }

    #[test]
    fn test_decode_shift_jis_page() {
        let html = "<table><tr><th>時刻</th><th>風向</th></tr></table>";
        let (bytes, _, had_errors) = SHIFT_JIS.encode(html);
        assert!(!had_errors);

        assert_eq!(decode_page(&bytes), html);
    }

    #[test]
    fn test_decode_falls_back_to_lossy() {
        // 0xFF is invalid in all three encodings
        let bytes = [b'o', b'k', 0xFF];
        assert_eq!(decode_page(&bytes), "ok\u{FFFD}");
    }
}

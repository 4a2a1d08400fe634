//! LNURL token encoding.
//!
//! An LNURL is a plain URL encoded as bech32 (not bech32m) under the `lnurl`
//! human-readable part. Tokens routinely exceed the 90 character limit of
//! segwit addresses; the only length bound is the bech32 code length.

use std::borrow::Cow;

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use thiserror::Error;

/// Human-readable part used by every LNURL.
pub const HRP: &str = "lnurl";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid \"url\" provided. String expected.")]
    MissingUrl,
    #[error("invalid bech32 token: {0}")]
    Bech32(String),
    #[error("unexpected human-readable part: {0}")]
    UnexpectedHrp(String),
    #[error("decoded token is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode a URL as a lowercase `lnurl1...` token.
///
/// # Errors
/// Returns an error if the URL is empty or too long for a bech32 string.
pub fn encode(url: &str) -> Result<String, Error> {
    if url.is_empty() {
        return Err(Error::MissingUrl);
    }
    let hrp = Hrp::parse(HRP).map_err(|e| Error::Bech32(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, url.as_bytes()).map_err(|e| Error::Bech32(e.to_string()))
}

/// Decode an `lnurl1...` token back into the URL it carries.
///
/// Accepts all-lowercase and all-uppercase tokens (QR codes use the latter);
/// mixed case is rejected by the bech32 parser.
///
/// # Errors
/// Returns an error if the token is empty, has a bad checksum, uses another
/// human-readable part or does not carry UTF-8.
pub fn decode(token: &str) -> Result<String, Error> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::MissingUrl);
    }

    let normalized: Cow<'_, str> = if token.bytes().all(|b| !b.is_ascii_lowercase()) {
        Cow::Owned(token.to_ascii_lowercase())
    } else {
        Cow::Borrowed(token)
    };

    let checked = CheckedHrpstring::new::<Bech32>(&normalized)
        .map_err(|e| Error::Bech32(e.to_string()))?;

    let hrp = checked.hrp();
    if hrp.as_str() != HRP {
        return Err(Error::UnexpectedHrp(hrp.to_string()));
    }

    let bytes: Vec<u8> = checked.byte_iter().collect();
    Ok(String::from_utf8(bytes)?)
}

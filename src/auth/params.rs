//! Login parameter validation.

use std::collections::HashMap;

use super::error::LoginError;

pub const PARAM_SIG: &str = "sig";
pub const PARAM_KEY: &str = "key";

/// A login callback whose `sig` and `key` are present and hex-decoded.
///
/// Only [`LoginRequest::from_params`] builds one, so holding a value means the
/// presence and encoding checks already passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    sig: Vec<u8>,
    key: Vec<u8>,
}

impl LoginRequest {
    /// Validate the raw query parameters.
    ///
    /// # Errors
    /// `MissingParameter` when `sig` or `key` is absent or blank (checked in
    /// that order), `MalformedEncoding` when a value is not hexadecimal.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, LoginError> {
        let sig = required(params, PARAM_SIG)?;
        let key = required(params, PARAM_KEY)?;

        Ok(Self {
            sig: decode_hex(sig, PARAM_SIG)?,
            key: decode_hex(key, PARAM_KEY)?,
        })
    }

    #[must_use]
    pub fn sig(&self) -> &[u8] {
        &self.sig
    }

    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

fn required<'a>(
    params: &'a HashMap<String, String>,
    field: &'static str,
) -> Result<&'a str, LoginError> {
    params
        .get(field)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(LoginError::MissingParameter(field))
}

fn decode_hex(value: &str, field: &'static str) -> Result<Vec<u8>, LoginError> {
    hex::decode(value).map_err(|_| LoginError::MalformedEncoding(field))
}

use crate::base62;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// A validated short code identifier for a shortened URL.
///
/// Short codes are base62 strings of 1-11 symbols, wide enough for any
/// `u64` counter value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(SmolStr);

impl ShortCode {
    /// Encodes a counter value into its canonical short code.
    pub fn from_counter(counter: u64) -> Self {
        Self(SmolStr::new(base62::encode(counter)))
    }

    /// Parses a short code supplied from outside the service.
    ///
    /// Any string of alphabet symbols that decodes into a `u64` is accepted,
    /// including non-canonical ones with leading zero symbols.
    pub fn parse(code: impl AsRef<str>) -> Result<Self, CoreError> {
        let code = code.as_ref();
        if code.len() > base62::MAX_ENCODED_LEN {
            return Err(CoreError::InvalidCodeFormat(format!(
                "length must be at most {}, got {}",
                base62::MAX_ENCODED_LEN,
                code.len()
            )));
        }
        base62::decode(code)?;
        Ok(Self(SmolStr::new(code)))
    }

    /// Decodes the counter value this code was generated from.
    pub fn counter(&self) -> Result<u64, CoreError> {
        base62::decode(&self.0)
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCode").field(&self.0).finish()
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShortCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ShortCode> for String {
    fn from(code: ShortCode) -> Self {
        code.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_counter_is_base62() {
        assert_eq!(ShortCode::from_counter(0).as_str(), "0");
        assert_eq!(ShortCode::from_counter(125).as_str(), "21");
    }

    #[test]
    fn counter_round_trips() {
        let code = ShortCode::from_counter(987_654_321);
        assert_eq!(code.counter().unwrap(), 987_654_321);
    }

    #[test]
    fn parse_accepts_alphabet_codes() {
        assert!(ShortCode::parse("abc").is_ok());
        assert!(ShortCode::parse("Z").is_ok());
        assert!(ShortCode::parse("zzzzzzzzzz").is_ok());
    }

    #[test]
    fn parse_rejects_invalid_codes() {
        assert!(ShortCode::parse("").is_err());
        assert!(ShortCode::parse("abc_def").is_err());
        assert!(ShortCode::parse("abc/def").is_err());
        assert!(ShortCode::parse("a".repeat(12)).is_err());
    }

    #[test]
    fn display() {
        let code = ShortCode::parse("my0code").unwrap();
        assert_eq!(code.to_string(), "my0code");
    }

    #[test]
    fn to_url() {
        let code = ShortCode::parse("abc123").unwrap();
        assert_eq!(code.to_url("https://tiny.link"), "https://tiny.link/abc123");
        assert_eq!(code.to_url("https://tiny.link/"), "https://tiny.link/abc123");
    }
}

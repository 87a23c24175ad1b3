//! Base62 codec for counter values.
//!
//! Digits are taken from [`ALPHABET`] most-significant first. `0` encodes to
//! the single zero symbol and no other value carries a leading zero symbol.

use crate::error::{CoreError, Result};

/// The symbol set, ordered by digit value.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: u64 = ALPHABET.len() as u64;

/// Number of symbols needed to encode `u64::MAX`.
pub const MAX_ENCODED_LEN: usize = 11;

/// Encodes `value` as a base62 string.
pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::with_capacity(MAX_ENCODED_LEN);
    while value > 0 {
        digits.push(ALPHABET[(value % BASE) as usize]);
        value /= BASE;
    }
    digits.reverse();

    // every byte comes from the ASCII alphabet
    digits.into_iter().map(char::from).collect()
}

/// Decodes a base62 string back into its counter value.
///
/// Leading zero symbols are accepted and ignored, so `"007"` decodes to the
/// same value as `"7"`.
pub fn decode(encoded: &str) -> Result<u64> {
    if encoded.is_empty() {
        return Err(CoreError::InvalidCodeFormat(
            "code must not be empty".to_string(),
        ));
    }

    encoded.bytes().try_fold(0_u64, |acc, symbol| {
        let digit = digit_value(symbol).ok_or_else(|| {
            CoreError::InvalidCodeFormat(format!(
                "symbol '{}' is outside the base62 alphabet",
                symbol.escape_ascii()
            ))
        })?;

        acc.checked_mul(BASE)
            .and_then(|shifted| shifted.checked_add(digit))
            .ok_or_else(|| {
                CoreError::InvalidCodeFormat(format!("'{encoded}' does not fit in 64 bits"))
            })
    })
}

fn digit_value(symbol: u8) -> Option<u64> {
    let value = match symbol {
        b'0'..=b'9' => symbol - b'0',
        b'A'..=b'Z' => symbol - b'A' + 10,
        b'a'..=b'z' => symbol - b'a' + 36,
        _ => return None,
    };
    Some(u64::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_first_symbol() {
        assert_eq!(encode(0), "0");
    }

    #[test]
    fn known_values() {
        assert_eq!(encode(9), "9");
        assert_eq!(encode(10), "A");
        assert_eq!(encode(35), "Z");
        assert_eq!(encode(36), "a");
        assert_eq!(encode(61), "z");
        assert_eq!(encode(62), "10");
        assert_eq!(encode(3843), "zz");
        assert_eq!(encode(3844), "100");
    }

    #[test]
    fn max_value_fits_in_max_len() {
        let encoded = encode(u64::MAX);
        assert_eq!(encoded.len(), MAX_ENCODED_LEN);
        assert_eq!(decode(&encoded).unwrap(), u64::MAX);
    }

    #[test]
    fn decode_rejects_empty() {
        assert!(matches!(decode(""), Err(CoreError::InvalidCodeFormat(_))));
    }

    #[test]
    fn decode_rejects_foreign_symbols() {
        assert!(decode("abc-def").is_err());
        assert!(decode("abc def").is_err());
        assert!(decode("ünï").is_err());
    }

    #[test]
    fn decode_rejects_overflow() {
        // one past u64::MAX
        let too_big = format!("{}1", encode(u64::MAX));
        assert!(decode(&too_big).is_err());
    }

    #[test]
    fn decode_accepts_leading_zero_symbols() {
        assert_eq!(decode("0000A").unwrap(), 10);
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(n in 0_u64..(1_u64 << 63)) {
            prop_assert_eq!(decode(&encode(n)).unwrap(), n);
        }

        #[test]
        fn no_leading_zero_symbol_for_positive_values(n in 1_u64..) {
            let encoded = encode(n);
            prop_assert!(!encoded.starts_with('0'));
        }

        #[test]
        fn encode_inverts_decode_for_canonical_codes(n in any::<u64>()) {
            let encoded = encode(n);
            prop_assert_eq!(encode(decode(&encoded).unwrap()), encoded);
        }
    }
}

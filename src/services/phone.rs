//! Phone number normalization and carrier network resolution.
//!
//! Gambian numbering plan: country code 220, 7-digit subscriber numbers.
//! The carrier is derived from the first digit of the subscriber number
//! using a fixed prefix table. Resolution is a pure function with no I/O
//! and no mutable state.

use crate::models::purchase::NetworkCode;

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPhone {
    /// Canonical form: `220` followed by the 7-digit subscriber number
    pub normalized: String,

    pub network_code: NetworkCode,
}

/// Why a phone number could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    /// Not a `220XXXXXXX`, `+220XXXXXXX` or 7-digit local number
    #[error("invalid phone number format")]
    InvalidFormat,

    /// Valid format, but the prefix maps to no known carrier. The system
    /// must not silently guess a carrier.
    #[error("phone prefix maps to no known network")]
    UnknownPrefix,
}

/// Normalize a raw phone number and derive its carrier network.
///
/// Accepts `+2203XXXXXX`, `2203XXXXXX`, or a bare 7-digit local number
/// (whitespace anywhere is ignored). Any other shape fails with
/// `InvalidFormat`.
///
/// Idempotent: resolving an already-normalized number yields the same
/// result.
///
/// # Prefix table
///
/// | first subscriber digit | network |
/// |---|---|
/// | 6 | COMIUM_GM |
/// | 2, 4, 7 | AFRICELL_GM |
/// | 3, 5 | QCELL_GM |
/// | 9 | GAMCELL_GM |
pub fn resolve(raw: &str) -> Result<ResolvedPhone, PhoneError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::InvalidFormat);
    }

    // Strip a leading 220 country prefix, or accept a bare local number.
    let local = match cleaned.len() {
        10 => cleaned
            .strip_prefix("220")
            .ok_or(PhoneError::InvalidFormat)?,
        7 => cleaned,
        _ => return Err(PhoneError::InvalidFormat),
    };

    let first = local.as_bytes()[0] - b'0';
    let network_code = match first {
        6 => NetworkCode::ComiumGm,
        2 | 4 | 7 => NetworkCode::AfricellGm,
        3 | 5 => NetworkCode::QcellGm,
        9 => NetworkCode::GamcellGm,
        _ => return Err(PhoneError::UnknownPrefix),
    };

    Ok(ResolvedPhone {
        normalized: format!("220{local}"),
        network_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spaced_local_format() {
        let r = resolve("220 3123456").unwrap();
        assert_eq!(r.normalized, "2203123456");
        assert_eq!(r.network_code, NetworkCode::QcellGm);
    }

    #[test]
    fn resolves_international_format() {
        let r = resolve("+2207123456").unwrap();
        assert_eq!(r.normalized, "2207123456");
        assert_eq!(r.network_code, NetworkCode::AfricellGm);
    }

    #[test]
    fn resolves_bare_local_number() {
        let r = resolve("6123456").unwrap();
        assert_eq!(r.normalized, "2206123456");
        assert_eq!(r.network_code, NetworkCode::ComiumGm);
    }

    #[test]
    fn resolves_gamcel_prefix() {
        let r = resolve("2209123456").unwrap();
        assert_eq!(r.network_code, NetworkCode::GamcellGm);
    }

    #[test]
    fn unknown_prefix_is_not_guessed() {
        assert_eq!(resolve("1234567"), Err(PhoneError::UnknownPrefix));
        assert_eq!(resolve("2208123456"), Err(PhoneError::UnknownPrefix));
    }

    #[test]
    fn rejects_wrong_lengths_and_non_digits() {
        assert_eq!(resolve("312345"), Err(PhoneError::InvalidFormat));
        assert_eq!(resolve("22031234567"), Err(PhoneError::InvalidFormat));
        assert_eq!(resolve("31234a6"), Err(PhoneError::InvalidFormat));
        assert_eq!(resolve(""), Err(PhoneError::InvalidFormat));
        // 10 digits not starting with the country prefix
        assert_eq!(resolve("1103123456"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = resolve("+220 5 123 456").unwrap();
        let twice = resolve(&once.normalized).unwrap();
        assert_eq!(once, twice);
    }
}

//! Short human-typable room codes.

use std::fmt;

use rand::Rng;

use crate::RoomError;

/// Characters used in generated codes. No `I`, `O`, `0` or `1`, so codes
/// read back unambiguously.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a generated code.
pub const CODE_LEN: usize = 6;

/// Longest code accepted from a client.
const MAX_CODE_LEN: usize = 16;

/// A room code such as `K7QMZP`. Always upper-case ASCII alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parses a client-supplied code, normalizing it to upper case.
    pub fn parse(raw: &str) -> Result<Self, RoomError> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = !code.is_empty()
            && code.len() <= MAX_CODE_LEN
            && code.bytes().all(|b| b.is_ascii_alphanumeric());
        if valid {
            Ok(Self(code))
        } else {
            Err(RoomError::InvalidCode(raw.to_string()))
        }
    }

    /// A random code of [`CODE_LEN`] characters from [`CODE_ALPHABET`].
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

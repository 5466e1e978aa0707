//! Reservation [`Code`] definitions.

use std::sync::LazyLock;

use derive_more::{AsRef, Display, FromStr};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use uuid::Uuid;

#[cfg(doc)]
use super::Reservation;

/// Human-shareable unique code of a [`Reservation`].
///
/// Formatted as `RSV-` followed by 8 characters of the Crockford base-32
/// alphabet.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Prefix of every [`Code`].
    const PREFIX: &'static str = "RSV-";

    /// Crockford base-32 alphabet.
    const ALPHABET: &'static [u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

    /// Number of alphabet characters following the [`Code::PREFIX`].
    const LEN: usize = 8;

    /// Generates a new random [`Code`].
    #[must_use]
    pub fn generate() -> Self {
        let mut bits = Uuid::new_v4().as_u128();
        let mut code = String::with_capacity(Self::PREFIX.len() + Self::LEN);
        code.push_str(Self::PREFIX);
        for _ in 0..Self::LEN {
            // Lower 5 bits always fit the alphabet.
            let idx = usize::try_from(bits & 0x1F).unwrap_or_default();
            code.push(char::from(Self::ALPHABET[idx]));
            bits >>= 5;
        }
        Self(code)
    }

    /// Creates a new [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^RSV-[0-9A-HJKMNP-TV-Z]{8}$").expect("valid regex")
        });

        REGEX.is_match(code.as_ref())
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `reservation::Code`")
    }
}

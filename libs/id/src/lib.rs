//! # offerloop-id
//!
//! Typed identifiers for offers, agents, and plan elements.
//!
//! Every ID renders as `{kind}_{ulid}`, e.g. `offer_01HV4Z2WQXKJNM8GPQY6VBKC3D`.
//! The kind keeps an offer ID from being accepted where a step ID is
//! expected; the ULID keeps IDs unique and ordered by creation time.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;
pub use ulid::Ulid;

/// Parses `{kind}_{ulid}`, checking the kind.
pub fn parse_prefixed(kind: &'static str, s: &str) -> Result<Ulid, IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    let (found, encoded) = s
        .split_once('_')
        .ok_or_else(|| IdError::Malformed(s.to_string()))?;
    if found != kind {
        return Err(IdError::WrongKind {
            expected: kind,
            found: found.to_string(),
        });
    }
    Ulid::from_string(encoded).map_err(|source| IdError::BadUlid {
        id: s.to_string(),
        source,
    })
}

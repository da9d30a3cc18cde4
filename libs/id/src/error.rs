use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("empty ID")]
    Empty,

    #[error("malformed ID {0:?}: expected `<kind>_<ulid>`")]
    Malformed(String),

    #[error("wrong ID kind: expected `{expected}`, found `{found}`")]
    WrongKind {
        expected: &'static str,
        found: String,
    },

    #[error("bad ULID in ID {id:?}")]
    BadUlid {
        id: String,
        #[source]
        source: ulid::DecodeError,
    },
}

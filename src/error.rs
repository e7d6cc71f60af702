// error.rs
// Error type for the crate's outer edges: commands, config loading and snapshot I/O.
// The step pipeline itself never returns errors.

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A species or hold-constant mode name that does not exist.
    #[error("unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParam(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::invalid("width must be finite");
        let msg = e.to_string();
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("width"));

        let e = Error::UnknownName { kind: "species", name: "argon".into() };
        assert_eq!(e.to_string(), "unknown species: argon");
    }
}

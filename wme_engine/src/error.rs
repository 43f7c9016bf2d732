use thiserror::Error;
use wme_formats::ParseError;

/// Why a frame definition could not be turned into a live frame.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("syntax error in FRAME definition: {0}")]
    Syntax(#[from] ParseError),
    #[error("error loading FRAME definition: {0}")]
    Generic(String),
}

/// Non-fatal conditions raised while dispatching a script member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("Call to undefined method '{0}'. Ignored.")]
    UnknownMethod(String),
    #[error("Subframe handle refers to a deleted subframe.")]
    StaleHandle,
}

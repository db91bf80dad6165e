//! Policy error types.

use thiserror::Error;

/// Errors produced while turning user input into a canonical domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Nothing but whitespace was entered.
    #[error("domain cannot be empty")]
    Empty,

    /// The input is neither a known alias nor a parseable URL.
    #[error("\"{input}\" is not a valid website or URL")]
    Invalid { input: String },
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The service answered, but with a non-success status.
    #[error("{0}")]
    Rejected(String),
    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("candidate `{0}` appears more than once on the ballot")]
    DuplicateCandidate(String),
}

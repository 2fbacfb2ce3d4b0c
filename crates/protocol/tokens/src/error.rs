use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("action '{0}' could not be minted: {1}")]
    MintFailed(String, String),

    #[error("token was issued under a previous boot session")]
    WrongBoot,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token has already reached its use limit")]
    Exhausted,

    #[error("token action_id '{expected}' does not match expected '{found}'")]
    ActionMismatch { expected: String, found: String },

    #[error("token actor '{expected}' does not match expected '{found}'")]
    ActorMismatch { expected: String, found: String },
}

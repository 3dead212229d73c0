use thiserror::Error;

/// Errors returned to the originating connection as an acknowledgment.
///
/// None of these are fatal; the connection stays open and the client decides
/// whether to resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Username and room are required!")]
    Validation,

    #[error("Username is in use!")]
    DuplicateName,

    #[error("Profanity is not allowed")]
    Profanity,

    #[error("You must join a room first")]
    NotJoined,

    #[error("Already joined a room")]
    AlreadyJoined,
}

impl ChatError {
    /// Stable machine-readable code, used for metric labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::DuplicateName => "duplicate_name",
            Self::Profanity => "profanity",
            Self::NotJoined => "not_joined",
            Self::AlreadyJoined => "already_joined",
        }
    }
}

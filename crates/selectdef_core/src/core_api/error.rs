use crate::document::EditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    InvalidIndex,
    InvalidEdit,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<EditError> for CoreError {
    fn from(e: EditError) -> Self {
        let code = match e {
            EditError::SlotOutOfRange { .. }
            | EditError::MemberOutOfRange { .. }
            | EditError::StageOutOfRange { .. } => CoreErrorCode::InvalidIndex,
            EditError::NotASingle(_)
            | EditError::NotAGroup(_)
            | EditError::EmptyGroup
            | EditError::EmptyCharacter
            | EditError::EmptyStagePath => CoreErrorCode::InvalidEdit,
        };
        Self::new(code, e.to_string())
    }
}

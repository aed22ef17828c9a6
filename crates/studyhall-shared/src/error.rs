use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown request status: {0}")]
    RequestStatus(String),

    #[error("Unknown study status: {0}")]
    StudyStatus(String),

    #[error("Unknown table: {0}")]
    Table(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextGraphError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("duplicate entity id: {0}")]
    DuplicateId(i64),
    #[error("duplicate relationship: {0}")]
    DuplicateEdge(String),
    #[error("self loop rejected on entity {0}")]
    SelfLoop(i64),
    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("unknown recommendation: {0}")]
    UnknownRecommendation(i64),
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl ContextGraphError {
    pub fn unknown_entity<T: Into<String>>(msg: T) -> Self {
        ContextGraphError::UnknownEntity(msg.into())
    }

    pub fn duplicate_edge<T: Into<String>>(msg: T) -> Self {
        ContextGraphError::DuplicateEdge(msg.into())
    }

    pub fn unsupported_operator<T: Into<String>>(msg: T) -> Self {
        ContextGraphError::UnsupportedOperator(msg.into())
    }

    pub fn invalid_parameter<T: Into<String>>(msg: T) -> Self {
        ContextGraphError::InvalidParameter(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        ContextGraphError::Cancelled(msg.into())
    }
}

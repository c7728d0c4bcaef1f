pub type SlidecastResult<T> = Result<T, SlidecastError>;

#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    #[error("path validation error: {0}")]
    PathValidation(String),

    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    #[error("deck parse error: {0}")]
    Parse(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("io error: {0}")]
    Io(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    pub fn path_validation(msg: impl Into<String>) -> Self {
        Self::PathValidation(msg.into())
    }

    pub fn dependency_missing(msg: impl Into<String>) -> Self {
        Self::DependencyMissing(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Pre-flight errors abort the run before any artifact is created.
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::PathValidation(_) | Self::DependencyMissing(_))
    }
}

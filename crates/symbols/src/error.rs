/// Failure to load or validate a placement scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    Json(String),
    Invalid { field: String, reason: String },
    Io(String),
}

impl SceneError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SceneError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::Json(msg) => write!(f, "scene json: {msg}"),
            SceneError::Invalid { field, reason } => write!(f, "invalid scene {field}: {reason}"),
            SceneError::Io(msg) => write!(f, "scene io: {msg}"),
        }
    }
}

impl std::error::Error for SceneError {}

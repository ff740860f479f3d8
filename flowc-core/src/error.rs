use thiserror::Error;

/// Unified error type for the control plane.
#[derive(Error, Debug)]
pub enum FlowcError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("port already in use: {0}")]
    PortInUse(String),

    #[error("name already in use: {0}")]
    NameInUse(String),

    #[error("hostname already in use: {0}")]
    HostnameInUse(String),

    #[error("entity has children: {0}")]
    HasChildren(String),

    #[error("bundle invalid: {0}")]
    BundleInvalid(String),

    #[error("unsupported API type: {0}")]
    SpecUnsupported(String),

    #[error("spec parse failed: {0}")]
    ParseFailed(String),

    #[error("translation failed: {0}")]
    TranslateFailed(String),

    #[error("snapshot publish failed: {0}")]
    PublishFailed(String),

    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("operation canceled")]
    Canceled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl FlowcError {
    /// Map to HTTP status code, the way `AndoError::status_code` does.
    pub fn status_code(&self) -> u16 {
        match self {
            FlowcError::InvalidInput(_) => 400,
            FlowcError::NotFound(_) => 404,
            FlowcError::AlreadyExists(_) => 409,
            FlowcError::PortInUse(_) => 409,
            FlowcError::NameInUse(_) => 409,
            FlowcError::HostnameInUse(_) => 409,
            FlowcError::HasChildren(_) => 400,
            FlowcError::BundleInvalid(_) => 400,
            FlowcError::SpecUnsupported(_) => 400,
            FlowcError::ParseFailed(_) => 400,
            FlowcError::TranslateFailed(_) => 500,
            FlowcError::PublishFailed(_) => 500,
            FlowcError::Unavailable(_) => 503,
            FlowcError::Canceled => 499,
            FlowcError::Io(_) => 500,
            FlowcError::Serde(_) => 400,
        }
    }

    /// `true` for the `conflict(portInUse|nameInUse|hostnameInUse)` family.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            FlowcError::PortInUse(_) | FlowcError::NameInUse(_) | FlowcError::HostnameInUse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FlowcError::NotFound("x".into()).status_code(), 404);
        assert_eq!(FlowcError::AlreadyExists("x".into()).status_code(), 409);
        assert_eq!(FlowcError::PortInUse("8080".into()).status_code(), 409);
        assert_eq!(FlowcError::HasChildren("g1".into()).status_code(), 400);
        assert_eq!(FlowcError::TranslateFailed("x".into()).status_code(), 500);
        assert_eq!(FlowcError::Unavailable("x".into()).status_code(), 503);
        assert_eq!(FlowcError::Canceled.status_code(), 499);
    }

    #[test]
    fn test_is_conflict() {
        assert!(FlowcError::PortInUse("80".into()).is_conflict());
        assert!(FlowcError::NameInUse("n".into()).is_conflict());
        assert!(FlowcError::HostnameInUse("h".into()).is_conflict());
        assert!(!FlowcError::NotFound("x".into()).is_conflict());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            FlowcError::NotFound("gateway g1".into()).to_string(),
            "not found: gateway g1"
        );
        assert_eq!(FlowcError::Canceled.to_string(), "operation canceled");
    }
}

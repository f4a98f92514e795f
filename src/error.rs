pub type PoseoverResult<T> = Result<T, PoseoverError>;

#[derive(thiserror::Error, Debug)]
pub enum PoseoverError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PoseoverError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PoseoverError::config("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            PoseoverError::resource("x")
                .to_string()
                .contains("resource error:")
        );
        assert!(PoseoverError::decode("x").to_string().contains("decode error:"));
        assert!(
            PoseoverError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PoseoverError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}

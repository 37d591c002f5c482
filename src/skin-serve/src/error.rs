use thiserror::Error;

/// Everything that can go wrong between receiving an upload and answering
/// the caller. Validation variants map to 400, the rest to 500.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no file attached to the request")]
    MissingFile,

    #[error("uploaded file has non-image type '{0}'")]
    InvalidType(String),

    #[error("uploaded file is {size} bytes, limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("prediction service unreachable: {0}")]
    UpstreamUnavailable(String),

    #[error("prediction service returned status {status}: {body}")]
    UpstreamRejected { status: u16, body: String },

    #[error("malformed prediction response: {0}")]
    MalformedPrediction(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status the caller should see for this failure.
    pub fn status(&self) -> u16 {
        match self {
            Error::MissingFile | Error::InvalidType(_) | Error::FileTooLarge { .. } => 400,
            _ => 500,
        }
    }

    /// Fixed user-facing message. Upstream detail stays in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::MissingFile => "No image uploaded",
            Error::InvalidType(_) => "File is not an image",
            Error::FileTooLarge { .. } => "File too large",
            _ => "Failed to process image",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_client_errors() {
        assert_eq!(Error::MissingFile.status(), 400);
        assert_eq!(Error::InvalidType("text/plain".into()).status(), 400);
        assert_eq!(
            Error::FileTooLarge {
                size: 6 << 20,
                limit: 5 << 20
            }
            .status(),
            400
        );
    }

    #[test]
    fn downstream_failures_are_server_errors() {
        assert_eq!(Error::UpstreamUnavailable("timed out".into()).status(), 500);
        assert_eq!(
            Error::UpstreamRejected {
                status: 403,
                body: String::new()
            }
            .status(),
            500
        );
        assert_eq!(Error::MalformedPrediction("short vector".into()).status(), 500);
        assert_eq!(Error::Internal("oops".into()).status(), 500);
    }

    #[test]
    fn downstream_failures_share_a_generic_message() {
        assert_eq!(Error::MissingFile.user_message(), "No image uploaded");
        assert_eq!(
            Error::UpstreamRejected {
                status: 502,
                body: "secret endpoint detail".into()
            }
            .user_message(),
            "Failed to process image"
        );
        assert_eq!(
            Error::UpstreamUnavailable("connection refused".into()).user_message(),
            "Failed to process image"
        );
    }
}

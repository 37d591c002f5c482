use std::env;
use std::fmt;

use crate::error::Error;

/// Environment variable the hosting platform injects the bearer token into.
pub const DEFAULT_TOKEN_VAR: &str = "GOOGLE_ACCESS_TOKEN";

/// Opaque bearer token for the prediction service. Deliberately not
/// `Display`/`Debug`-printable so it cannot leak into logs.
pub struct AccessToken(String);

impl AccessToken {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Where the bearer token comes from. The token is resolved on every
/// request rather than cached, so a rotated credential takes effect
/// without a restart.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Read the named environment variable on each resolve.
    Env(String),
    /// A fixed token string, for tests and local runs.
    Fixed(String),
}

impl TokenSource {
    pub fn from_default_env() -> Self {
        TokenSource::Env(DEFAULT_TOKEN_VAR.to_owned())
    }

    pub fn resolve(&self) -> Result<AccessToken, Error> {
        match self {
            TokenSource::Env(var) => env::var(var)
                .map(AccessToken)
                .map_err(|_| Error::Internal(format!("credential variable {} is not set", var))),
            TokenSource::Fixed(token) => Ok(AccessToken(token.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_resolves() {
        let token = TokenSource::Fixed("ya29.sample".into()).resolve().unwrap();
        assert_eq!(token.expose(), "ya29.sample");
    }

    #[test]
    fn env_source_reads_the_variable() {
        env::set_var("SKIN_SERVE_TEST_TOKEN", "tok-123");
        let source = TokenSource::Env("SKIN_SERVE_TEST_TOKEN".into());
        assert_eq!(source.resolve().unwrap().expose(), "tok-123");
    }

    #[test]
    fn unset_variable_is_an_internal_error() {
        let source = TokenSource::Env("SKIN_SERVE_TEST_TOKEN_UNSET".into());
        match source.resolve() {
            Err(Error::Internal(msg)) => assert!(msg.contains("SKIN_SERVE_TEST_TOKEN_UNSET")),
            other => panic!("expected internal error, got {:?}", other.map(|t| format!("{:?}", t))),
        }
    }

    #[test]
    fn debug_format_hides_the_token() {
        let token = TokenSource::Fixed("secret".into()).resolve().unwrap();
        assert_eq!(format!("{:?}", token), "AccessToken(..)");
    }
}

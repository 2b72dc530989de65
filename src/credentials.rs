//! HERE platform credentials from a `credentials.properties` file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const KEY_ACCESS_KEY_ID: &str = "here.access.key.id";
pub const KEY_ACCESS_KEY_SECRET: &str = "here.access.key.secret";
pub const KEY_TOKEN_ENDPOINT: &str = "here.token.endpoint.url";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to read credentials file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Credentials are missing '{0}'")]
    MissingKey(&'static str),

    #[error("Malformed credentials line {line}: '{content}'")]
    Malformed { line: usize, content: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub token_endpoint_url: String,
}

// Keep the secret out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("token_endpoint_url", &self.token_endpoint_url)
            .finish()
    }
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let content = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses `key = value` lines. Blank lines, `#` comments and keys other
    /// than the access key, secret and token endpoint are ignored.
    pub fn parse(content: &str) -> Result<Self, CredentialsError> {
        let mut values = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(CredentialsError::Malformed {
                    line: index + 1,
                    content: line.to_string(),
                });
            };
            values.insert(key.trim().to_string(), value.trim().to_string());
        }

        let mut required = |key: &'static str| {
            values
                .remove(key)
                .filter(|value| !value.is_empty())
                .ok_or(CredentialsError::MissingKey(key))
        };

        let access_key_id = required(KEY_ACCESS_KEY_ID)?;
        let access_key_secret = required(KEY_ACCESS_KEY_SECRET)?;
        let token_endpoint_url = required(KEY_TOKEN_ENDPOINT)?;

        Ok(Self {
            access_key_id,
            access_key_secret,
            token_endpoint_url,
        })
    }
}

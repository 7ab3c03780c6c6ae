//! Credential wrapper built on the secrecy crate
//!
//! Database connection strings carry passwords. They are held in a
//! `Secret<SecretValue>` so that the value is zeroed on drop, is redacted in
//! `Debug` output, and can only be read through `expose_secret()`.
//!
//! ```rust
//! use phi_archive::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://archiver:pw@db/phi".to_string());
//! assert!(dsn.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{dsn:?}").contains("pw@db"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parses the secret value, e.g. a connection string into a driver config
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A string that is zeroed on drop and redacted in `Debug`
pub type SecretString = Secret<SecretValue>;

/// Wraps a String as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("postgresql://u:p@h/db".to_string());
        assert_eq!(secret.expose_secret(), "postgresql://u:p@h/db");
        assert!(secret.expose_secret().starts_with("postgresql://"));
        assert!(!secret.expose_secret().is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("postgresql://u:hunter2@h/db".to_string());
        let debug_output = format!("{secret:?}");

        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_secret_parse() {
        let secret = secret_string("42".to_string());
        let parsed: u32 = secret.expose_secret().parse().unwrap();
        assert_eq!(parsed, 42);
    }

    #[test]
    fn test_secret_serde() {
        #[derive(Serialize, Deserialize)]
        struct Credentials {
            connection_string: SecretString,
        }

        let toml_text = r#"connection_string = "postgres://localhost/phi""#;
        let credentials: Credentials = toml::from_str(toml_text).unwrap();
        assert_eq!(
            credentials.connection_string.expose_secret(),
            "postgres://localhost/phi"
        );

        let json = serde_json::to_string(&credentials).unwrap();
        assert!(json.contains("postgres://localhost/phi"));
    }
}

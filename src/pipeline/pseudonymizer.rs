//! Deterministic pseudonymization of patient names
//!
//! `id = base64_standard_padded(sha256(utf8(name)))`. No salt is applied, so
//! the same name yields the same identifier in every run and every record.
//! The mapping is therefore open to dictionary attacks over small name
//! spaces; joins across runs depend on it staying unsalted.

use crate::config::PseudonymizationConfig;
use crate::domain::{AnonymizedId, PipelineError, Result};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
}

impl FromStr for DigestAlgorithm {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(PipelineError::DigestUnavailable(format!(
                "Digest algorithm '{other}' is not available"
            ))),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Maps patient names to anonymized identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pseudonymizer {
    algorithm: DigestAlgorithm,
}

impl Pseudonymizer {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Builds the pseudonymizer named by the configuration
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DigestUnavailable`] for an unsupported algorithm.
    pub fn from_config(config: &PseudonymizationConfig) -> Result<Self> {
        Ok(Self::new(config.digest.parse()?))
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Pseudonymizes one name
    ///
    /// # Examples
    ///
    /// ```
    /// use phi_archive::pipeline::Pseudonymizer;
    ///
    /// let pseudonymizer = Pseudonymizer::default();
    /// let id = pseudonymizer.pseudonymize("Jane Doe");
    /// assert_eq!(id.as_str(), "ATMsh2UYp5O3wbjfr21LQE/12wmyHGYnyllxDMJPaWo=");
    /// ```
    pub fn pseudonymize(&self, name: &str) -> AnonymizedId {
        let digest = match self.algorithm {
            DigestAlgorithm::Sha256 => Sha256::digest(name.as_bytes()),
        };
        AnonymizedId::from(general_purpose::STANDARD.encode(digest))
    }
}

impl Default for Pseudonymizer {
    fn default() -> Self {
        Self::new(DigestAlgorithm::Sha256)
    }
}

//! Identifier validation and credential handling.
//!
//! Schema, table and column names are interpolated into SQL text by the
//! [`queries`](crate::queries) builders. Every identifier goes through
//! [`SqlSecurity::validate_identifier`] first.

use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ExplorerError, Result};

/// Longest identifier PostgreSQL keeps without truncation.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// SQL identifier validation utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a single unquoted SQL identifier.
    ///
    /// Accepted identifiers start with a letter or underscore and continue with
    /// letters, digits, underscores or `$`. Dotted names are rejected: schema,
    /// table and column are always validated separately.
    ///
    /// # Examples
    /// ```rust
    /// use table_explorer::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("employee_id").is_ok());
    /// assert!(SqlSecurity::validate_identifier("last_update").is_ok());
    /// assert!(SqlSecurity::validate_identifier("id; drop table users--").is_err());
    /// assert!(SqlSecurity::validate_identifier("").is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(ExplorerError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(ExplorerError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(ExplorerError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(ExplorerError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores and '$'"
            )));
        }

        Ok(())
    }

    /// Returns true when [`validate_identifier`](Self::validate_identifier) accepts the input.
    pub fn is_valid_identifier(identifier: &str) -> bool {
        Self::validate_identifier(identifier).is_ok()
    }
}

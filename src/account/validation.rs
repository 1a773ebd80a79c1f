//! Input validation for card numbers and requesting identities
//!
//! Validated newtypes with private fields: the only way in is `new()`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============================================================================
// AccountNumber
// ============================================================================

/// Validated card number
///
/// # Validation Rules
/// - Surrounding whitespace is trimmed
/// - Length: 4-32 characters
/// - ASCII digits only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub const MIN_LEN: usize = 4;
    pub const MAX_LEN: usize = 32;

    /// # Examples
    /// ```
    /// use card_transfer::account::AccountNumber;
    ///
    /// let card = AccountNumber::new(" 4000123412341234 ").unwrap();
    /// assert_eq!(card.as_str(), "4000123412341234");
    ///
    /// assert!(AccountNumber::new("4000-1234").is_err());
    /// ```
    pub fn new(number: &str) -> Result<Self, ValidationError> {
        let number = number.trim();

        if number.len() < Self::MIN_LEN || number.len() > Self::MAX_LEN {
            return Err(ValidationError::InvalidLength {
                field: "account_number",
                min: Self::MIN_LEN,
                max: Self::MAX_LEN,
                actual: number.len(),
            });
        }

        if !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "account_number",
                value: number.to_string(),
                expected: "ASCII digits only",
            });
        }

        Ok(Self(number.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four digits, for log lines
    pub fn masked(&self) -> String {
        let tail = &self.0[self.0.len() - 4..];
        format!("****{}", tail)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Authenticated requester, identified by login email
///
/// Emails compare case-insensitively, so the stored form is lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub const MAX_LEN: usize = 255;

    pub fn new(email: &str) -> Result<Self, ValidationError> {
        let email = email.trim();

        if email.is_empty() || email.len() > Self::MAX_LEN {
            return Err(ValidationError::InvalidLength {
                field: "identity",
                min: 1,
                max: Self::MAX_LEN,
                actual: email.len(),
            });
        }

        let well_formed = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !well_formed || email.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidFormat {
                field: "identity",
                value: email.to_string(),
                expected: "email address",
            });
        }

        Ok(Self(email.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number_valid() {
        assert!(AccountNumber::new("1234").is_ok());
        assert!(AccountNumber::new("4000123412341234").is_ok());
        assert_eq!(AccountNumber::new(" 5555 ").unwrap().as_str(), "5555");
    }

    #[test]
    fn test_account_number_invalid_length() {
        assert!(matches!(
            AccountNumber::new("123"),
            Err(ValidationError::InvalidLength { actual: 3, .. })
        ));
        assert!(AccountNumber::new(&"1".repeat(33)).is_err());
        assert!(AccountNumber::new("   ").is_err());
    }

    #[test]
    fn test_account_number_invalid_chars() {
        assert!(matches!(
            AccountNumber::new("4000-1234"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(AccountNumber::new("40001234abcd").is_err());
    }

    #[test]
    fn test_account_number_masked() {
        let card = AccountNumber::new("4000123412349876").unwrap();
        assert_eq!(card.masked(), "****9876");
    }

    #[test]
    fn test_account_number_serde() {
        let card: AccountNumber = serde_json::from_str("\"40001234\"").unwrap();
        assert_eq!(card.as_str(), "40001234");
        assert!(serde_json::from_str::<AccountNumber>("\"12ab\"").is_err());
    }

    #[test]
    fn test_identity_normalized() {
        let id = Identity::new("  Alice@Example.COM ").unwrap();
        assert_eq!(id.as_str(), "alice@example.com");
        assert_eq!(id, Identity::new("alice@example.com").unwrap());
    }

    #[test]
    fn test_identity_invalid() {
        assert!(Identity::new("").is_err());
        assert!(Identity::new("alice").is_err());
        assert!(Identity::new("@example.com").is_err());
        assert!(Identity::new("alice@").is_err());
        assert!(Identity::new("a@b@c").is_err());
        assert!(Identity::new("al ice@example.com").is_err());
    }
}

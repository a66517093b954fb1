//! Name validation for collection and field identifiers
//!
//! Payload documents are passed to the driver untouched; only the names the
//! facade itself places into commands are checked here.

use mangrove_common::{MangroveError, Result};
use tracing::warn;

/// Maximum allowed length for collection names (MongoDB limit is 255, we're more conservative)
const MAX_COLLECTION_NAME_LENGTH: usize = 120;

/// Maximum allowed length for field names
const MAX_FIELD_NAME_LENGTH: usize = 1024;

/// Collection name checked for emptiness, length, NUL bytes and `$`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollectionName {
    name: String,
}

impl ValidatedCollectionName {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(MangroveError::Validation(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_COLLECTION_NAME_LENGTH {
            return Err(MangroveError::Validation(format!(
                "Collection name exceeds maximum length of {} characters: '{}'",
                MAX_COLLECTION_NAME_LENGTH, name
            )));
        }

        if name.contains('\0') {
            return Err(MangroveError::Validation(
                "Collection name cannot contain null bytes".to_string(),
            ));
        }

        if name.contains('$') {
            return Err(MangroveError::Validation(format!(
                "Collection name cannot contain '$' character: '{}'",
                name
            )));
        }

        if name.contains("..") {
            warn!(collection = name, "Collection name contains suspicious pattern");
        }

        Ok(ValidatedCollectionName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for ValidatedCollectionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ValidatedCollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Field name used in sort specs and `distinct`
///
/// Dotted paths are allowed; a leading `$` is not, with the exception of
/// `$natural` which the server accepts as a sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFieldName {
    name: String,
}

impl ValidatedFieldName {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(MangroveError::Validation(
                "Field name cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_FIELD_NAME_LENGTH {
            return Err(MangroveError::Validation(format!(
                "Field name exceeds maximum length of {} characters",
                MAX_FIELD_NAME_LENGTH
            )));
        }

        if name.contains('\0') {
            return Err(MangroveError::Validation(
                "Field name cannot contain null bytes".to_string(),
            ));
        }

        if name.starts_with('$') && name != "$natural" {
            return Err(MangroveError::Validation(format!(
                "Field name cannot start with '$' (reserved for operators): '{}'",
                name
            )));
        }

        Ok(ValidatedFieldName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for ValidatedFieldName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ValidatedFieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        for name in ["users", "user_profiles", "orders.2024", "Users123", "system.profile"] {
            assert!(ValidatedCollectionName::new(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_empty_collection_name() {
        let result = ValidatedCollectionName::new("");
        assert!(matches!(result, Err(MangroveError::Validation(_))));
    }

    #[test]
    fn test_collection_name_too_long() {
        let long_name = "a".repeat(MAX_COLLECTION_NAME_LENGTH + 1);
        assert!(ValidatedCollectionName::new(&long_name).is_err());
        let max_name = "a".repeat(MAX_COLLECTION_NAME_LENGTH);
        assert!(ValidatedCollectionName::new(&max_name).is_ok());
    }

    #[test]
    fn test_collection_name_with_null_byte() {
        assert!(ValidatedCollectionName::new("users\0admin").is_err());
    }

    #[test]
    fn test_collection_name_with_dollar_sign() {
        let err = ValidatedCollectionName::new("users$cmd").unwrap_err();
        assert!(err.to_string().contains("'$'"));
    }

    #[test]
    fn test_validated_collection_name_display() {
        let name = ValidatedCollectionName::new("users").unwrap();
        assert_eq!(name.to_string(), "users");
        assert_eq!(name.as_ref(), "users");
        assert_eq!(name.into_string(), "users".to_string());
    }

    #[test]
    fn test_valid_field_names() {
        for name in ["name", "address.city", "tags.0", "_id", "$natural"] {
            assert!(ValidatedFieldName::new(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_field_names() {
        assert!(ValidatedFieldName::new("").is_err());
        assert!(ValidatedFieldName::new("$where").is_err());
        assert!(ValidatedFieldName::new("na\0me").is_err());
        assert!(ValidatedFieldName::new(&"f".repeat(MAX_FIELD_NAME_LENGTH + 1)).is_err());
    }
}

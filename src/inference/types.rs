//! Column type inference from the declared-type header row

use crate::ingest::IngestError;
use crate::models::{ColumnSpec, StorageType};
use crate::naming::is_first_letter_uppercase;

/// Declared-type substrings and the storage type they map to
///
/// Order matters: the first entry contained in the token wins, so `int64`
/// must be checked before `int` and `uint` before `int`.
pub const TYPE_TOKENS: &[(&str, StorageType)] = &[
    ("int64", StorageType::String),
    ("uint", StorageType::BigInt),
    ("int", StorageType::Integer),
    ("byte", StorageType::Integer),
    ("bit", StorageType::Boolean),
    ("str", StorageType::String),
    ("char", StorageType::String),
    ("bool", StorageType::Boolean),
    ("single", StorageType::String),
];

/// Capitalized tokens that name a value type rather than another sheet
pub const TYPE_EXCEPTIONS: &[(&str, StorageType)] = &[("HousingPlacement", StorageType::Boolean)];

/// Infer the column at `position` from its declared-type token
///
/// `names` is the sanitized header row. Position 0 is always the integer
/// primary key; a capitalized token is a reference to another sheet and
/// becomes a nullable integer (unless listed in [`TYPE_EXCEPTIONS`]).
///
/// # Errors
///
/// Returns [`IngestError::UnknownTypeToken`] when no entry of [`TYPE_TOKENS`]
/// occurs in the token.
pub fn infer_column(
    names: &[String],
    position: usize,
    token: &str,
) -> Result<ColumnSpec, IngestError> {
    if position == 0 {
        return Ok(ColumnSpec::primary_key());
    }

    let name = names
        .get(position)
        .cloned()
        .unwrap_or_else(|| format!("column_{}", position));

    if is_first_letter_uppercase(token) {
        let storage_type = TYPE_EXCEPTIONS
            .iter()
            .find(|(exception, _)| *exception == token)
            .map(|(_, ty)| *ty)
            .unwrap_or(StorageType::Integer);
        return Ok(ColumnSpec::nullable(name, storage_type));
    }

    match lookup_type_token(token) {
        Some(storage_type) => Ok(ColumnSpec::nullable(name, storage_type)),
        None => Err(IngestError::UnknownTypeToken {
            column: name,
            token: token.to_string(),
        }),
    }
}

/// First storage type whose token occurs in `token`
pub fn lookup_type_token(token: &str) -> Option<StorageType> {
    TYPE_TOKENS
        .iter()
        .find(|(needle, _)| token.contains(needle))
        .map(|(_, ty)| *ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["pk", "name", "quest", "housing", "count"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_position_zero_is_primary_key() {
        let column = infer_column(&names(), 0, "str").unwrap();
        assert_eq!(column, ColumnSpec::primary_key());
        assert!(!column.nullable);
    }

    #[test]
    fn test_capitalized_token_is_reference() {
        let column = infer_column(&names(), 2, "Quest").unwrap();
        assert_eq!(column.name, "quest");
        assert_eq!(column.storage_type, StorageType::Integer);
        assert!(column.nullable);
        assert!(!column.primary_key);

        let exception = infer_column(&names(), 3, "HousingPlacement").unwrap();
        assert_eq!(exception.storage_type, StorageType::Boolean);
    }

    #[test]
    fn test_token_table_order() {
        assert_eq!(lookup_type_token("int64"), Some(StorageType::String));
        assert_eq!(lookup_type_token("uint32"), Some(StorageType::BigInt));
        assert_eq!(lookup_type_token("int16"), Some(StorageType::Integer));
        assert_eq!(lookup_type_token("sbyte"), Some(StorageType::Integer));
        assert_eq!(lookup_type_token("bit&01"), Some(StorageType::Boolean));
        assert_eq!(lookup_type_token("str"), Some(StorageType::String));
        assert_eq!(lookup_type_token("bool"), Some(StorageType::Boolean));
        assert_eq!(lookup_type_token("single"), Some(StorageType::String));
        assert_eq!(lookup_type_token("float"), None);
    }

    #[test]
    fn test_unknown_token_is_an_error() {
        let err = infer_column(&names(), 4, "float").unwrap_err();
        assert!(matches!(
            err,
            IngestError::UnknownTypeToken { ref column, ref token } if column == "count" && token == "float"
        ));
    }
}

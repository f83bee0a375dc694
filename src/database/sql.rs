//! SQL statement builders shared by the store backends
//!
//! Identifiers are always double-quoted, which both SQLite and PostgreSQL
//! accept. Only parameter placeholders and `DROP TABLE` differ per dialect.

use crate::models::{ColumnSpec, ForeignKeyConstraint, StorageType, TableDescriptor};

/// SQL dialect of a store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", index),
            Dialect::Postgres => format!("${}", index),
        }
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column type name for a storage type
pub fn column_type_sql(storage_type: StorageType) -> String {
    match storage_type {
        StorageType::Integer => "INTEGER".to_string(),
        StorageType::BigInt => "BIGINT".to_string(),
        StorageType::Boolean => "BOOLEAN".to_string(),
        StorageType::String | StorageType::SizedString(_) => {
            format!("VARCHAR({})", storage_type.length().unwrap_or_default())
        }
    }
}

/// Parse a declared column type back into a storage type
///
/// Accepts the names produced by [`column_type_sql`] in any case.
pub fn parse_column_type(declared: &str) -> Option<StorageType> {
    let declared = declared.trim().to_ascii_uppercase();

    match declared.as_str() {
        "INTEGER" | "INT" | "INT4" => return Some(StorageType::Integer),
        "BIGINT" | "INT8" => return Some(StorageType::BigInt),
        "BOOLEAN" | "BOOL" => return Some(StorageType::Boolean),
        _ => {}
    }

    let length = declared
        .strip_prefix("VARCHAR(")
        .or_else(|| declared.strip_prefix("CHARACTER VARYING("))?
        .strip_suffix(')')?
        .trim()
        .parse()
        .ok()?;
    Some(StorageType::string_with_length(length))
}

fn column_definition(column: &ColumnSpec) -> String {
    let mut definition = format!(
        "{} {}",
        quote_ident(&column.name),
        column_type_sql(column.storage_type)
    );
    if !column.nullable {
        definition.push_str(" NOT NULL");
    }
    definition
}

fn foreign_key_clause(foreign_key: &ForeignKeyConstraint) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_ident(&foreign_key.name),
        quote_ident(&foreign_key.column),
        quote_ident(&foreign_key.referenced_table),
        quote_ident(&foreign_key.referenced_column)
    )
}

/// `CREATE TABLE` for `table`, created under `name`
///
/// The name is separate so a table can be rebuilt under a temporary name.
pub fn create_table_sql(name: &str, table: &TableDescriptor) -> String {
    let mut parts: Vec<String> = table.columns().iter().map(column_definition).collect();
    parts.push(format!(
        "PRIMARY KEY ({})",
        quote_ident(&table.primary_key().name)
    ));
    parts.extend(table.foreign_keys().iter().map(foreign_key_clause));

    format!("CREATE TABLE {} ({})", quote_ident(name), parts.join(", "))
}

/// `DROP TABLE IF EXISTS`, cascading to dependent constraints on PostgreSQL
pub fn drop_table_sql(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::Sqlite => format!("DROP TABLE IF EXISTS {}", quote_ident(name)),
        Dialect::Postgres => format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(name)),
    }
}

/// Comma-separated quoted column list
pub fn column_list(table: &TableDescriptor) -> String {
    table
        .columns()
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Positional `INSERT` covering every column of `table`
pub fn insert_sql(dialect: Dialect, table: &TableDescriptor) -> String {
    let placeholders = (1..=table.columns().len())
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table.name()),
        column_list(table),
        placeholders
    )
}

/// `ALTER TABLE .. ADD CONSTRAINT .. FOREIGN KEY`
pub fn add_foreign_key_sql(table: &str, foreign_key: &ForeignKeyConstraint) -> String {
    format!(
        "ALTER TABLE {} ADD {}",
        quote_ident(table),
        foreign_key_clause(foreign_key)
    )
}

/// `ALTER TABLE .. DROP CONSTRAINT`
pub fn drop_constraint_sql(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        quote_ident(table),
        quote_ident(constraint)
    )
}

/// Null out every value of `from_table.column` without a match in
/// `to_table.to_column`
pub fn clear_dangling_sql(from_table: &str, column: &str, to_table: &str, to_column: &str) -> String {
    let column = quote_ident(column);
    format!(
        "UPDATE {from} SET {col} = NULL WHERE {col} IS NOT NULL AND {col} NOT IN (SELECT {to_col} FROM {to} WHERE {to_col} IS NOT NULL)",
        from = quote_ident(from_table),
        col = column,
        to = quote_ident(to_table),
        to_col = quote_ident(to_column),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest() -> TableDescriptor {
        TableDescriptor::new(
            "quest",
            vec![
                ColumnSpec::primary_key(),
                ColumnSpec::nullable("name", StorageType::String),
                ColumnSpec::nullable("item", StorageType::Integer),
            ],
        )
        .unwrap()
        .with_foreign_key(ForeignKeyConstraint::to_primary_key("quest", "item", "item"))
        .unwrap()
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            create_table_sql("quest", &quest()),
            "CREATE TABLE \"quest\" (\"pk\" INTEGER NOT NULL, \"name\" VARCHAR(255), \"item\" INTEGER, \
             PRIMARY KEY (\"pk\"), CONSTRAINT \"fk_quest_item\" FOREIGN KEY (\"item\") REFERENCES \"item\" (\"pk\"))"
        );
    }

    #[test]
    fn test_insert_placeholders() {
        assert_eq!(
            insert_sql(Dialect::Sqlite, &quest()),
            "INSERT INTO \"quest\" (\"pk\", \"name\", \"item\") VALUES (?1, ?2, ?3)"
        );
        assert!(insert_sql(Dialect::Postgres, &quest()).ends_with("VALUES ($1, $2, $3)"));
    }

    #[test]
    fn test_column_types_read_back() {
        for ty in [
            StorageType::Integer,
            StorageType::BigInt,
            StorageType::Boolean,
            StorageType::String,
            StorageType::SizedString(4096),
        ] {
            assert_eq!(parse_column_type(&column_type_sql(ty)), Some(ty));
        }
        assert_eq!(parse_column_type("varchar(12)"), Some(StorageType::SizedString(12)));
        assert_eq!(parse_column_type("BLOB"), None);
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(
            drop_table_sql(Dialect::Postgres, "quest"),
            "DROP TABLE IF EXISTS \"quest\" CASCADE"
        );
    }
}

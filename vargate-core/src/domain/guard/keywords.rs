// vargate-core/src/domain/guard/keywords.rs

/// Statement forms allowed as the first keyword.
pub const ALLOWED_LEADING_KEYWORDS: &[&str] = &["SELECT", "WITH"];

/// Keywords rejected anywhere in the token stream, nested clauses included.
pub const DENIED_KEYWORDS: &[&str] = &[
    // Data modification
    "INSERT",
    "UPDATE",
    "DELETE",
    "REPLACE",
    "MERGE",
    "UPSERT",
    "TRUNCATE",
    "INTO",
    // Data definition
    "CREATE",
    "DROP",
    "ALTER",
    "RENAME",
    // Privileges
    "GRANT",
    "REVOKE",
    // Transaction control
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
    "SAVEPOINT",
    "RELEASE",
    // Database attachment & pragmas
    "ATTACH",
    "DETACH",
    "PRAGMA",
    // Maintenance
    "VACUUM",
    "REINDEX",
    "ANALYZE",
    "CHECKPOINT",
    // Extensions & external IO
    "LOAD_EXTENSION",
    "INSTALL",
    "LOAD",
    "COPY",
    "EXPORT",
    "IMPORT",
    "CALL",
];

pub fn is_denied(word: &str) -> bool {
    DENIED_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

pub fn is_allowed_leading(word: &str) -> bool {
    ALLOWED_LEADING_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(word))
}

/// `REPLACE(col, 'a', 'b')` is the string function, not the statement.
pub fn is_function_exception(word: &str) -> bool {
    word.eq_ignore_ascii_case("REPLACE")
}

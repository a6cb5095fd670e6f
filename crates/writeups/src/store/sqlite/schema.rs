//! `SQLite` schema definitions for the writeups table.

/// Name of the table holding write-ups.
pub const WRITEUPS_TABLE: &str = "writeups";

/// SQL statement to create the writeups table.
///
/// Ids default to 32 random hex characters, like a server-generated key.
pub const CREATE_WRITEUPS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS writeups (
    id TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
    title TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL CHECK (difficulty IN ('Easy', 'Medium', 'Hard', 'Insane')),
    platform TEXT NOT NULL,
    date TEXT NOT NULL,
    tags TEXT,
    content TEXT NOT NULL,
    published INTEGER NOT NULL DEFAULT 0,
    slug TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `created_at` for recency ordering.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_writeups_created_at ON writeups(created_at DESC)
";

/// SQL statement to create an index on slug for reader lookups.
pub const CREATE_SLUG_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_writeups_slug ON writeups(slug)
";

/// SQL statement to create an index on platform for filtering.
pub const CREATE_PLATFORM_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_writeups_platform ON writeups(platform)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_WRITEUPS_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_SLUG_INDEX,
    CREATE_PLATFORM_INDEX,
    CREATE_METADATA_TABLE,
];

/// Columns selected for every read, in `row_to_stored` order.
pub const WRITEUP_COLUMNS: &str = "id, title, description, category, difficulty, platform, \
     date, tags, content, published, slug, created_at, updated_at";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_writeups_table_contains_required_columns() {
        for column in WRITEUP_COLUMNS.split(", ") {
            assert!(
                CREATE_WRITEUPS_TABLE.contains(&format!("{} ", column.trim())),
                "missing column {column}"
            );
        }
        assert!(CREATE_WRITEUPS_TABLE.contains(WRITEUPS_TABLE));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}

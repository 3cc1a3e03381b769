//! Column counts for the seven tables of dump schema 0114, matching the
//! order columns are declared in `migrations/V1__initial_schema.sql` (and
//! the order each `table_record`'s cells arrive in).

pub(crate) fn column_count(table: &str) -> Option<usize> {
    match table {
        "attrib" => Some(10),
        "bind" => Some(7),
        "bsite" => Some(7),
        "compver" => Some(37),
        "control" => Some(3),
        "relate" => Some(4),
        "release" => Some(2),
        _ => None,
    }
}

/// Quotes a table name for use in SQL; `release` collides with the
/// `RELEASE SAVEPOINT` keyword otherwise.
pub(crate) fn quoted_table_name(table: &str) -> String {
    format!("\"{}\"", table)
}

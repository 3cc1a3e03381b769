//! Registers the `ccm_status` scalar function used by compiled queries to
//! read an object's current status without a materialised column.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::functions::FunctionFlags;

use crate::error::Error;

static STATUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Status set to '(\w+)' by").unwrap());

/// Extracts the last `Status set to '<name>' by` match from `status_log`,
/// or the empty string if there is none.
pub(crate) fn ccm_status(status_log: &str) -> String {
    STATUS_RE
        .captures_iter(status_log)
        .last()
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

pub(crate) fn register(conn: &rusqlite::Connection) -> Result<(), Error> {
    conn.create_scalar_function(
        "ccm_status",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(match text {
                Some(text) => ccm_status(&text),
                None => String::new(),
            })
        },
    )?;
    Ok(())
}

//! Compiles the CM query expression language (spec.md §4.6) into SQL
//! against the relational image built by `ccm-store`.
//!
//! ```
//! let sql = ccm_query::compile("~", "status='released' and type='dir'").unwrap();
//! assert!(sql.contains("ccm_status(attrib.textval) = 'released'"));
//! ```

mod compile;
mod error;
mod grammar;
mod types;

pub use compile::{compile, parse_fpn};
pub use error::Error;
pub use types::{Atom, Comparator, Expr, Fpn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pipeline_rejects_trailing_garbage() {
        assert!(matches!(
            compile("~", "status='released' ) trailing"),
            Err(Error::TrailingInput(_))
        ));
    }
}

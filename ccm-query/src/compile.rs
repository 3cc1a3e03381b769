//! Compiles a parsed [`Expr`] into the `WHERE` clause of a fixed `SELECT`
//! against the `compver`/`attrib`/`relate`/`bind` tables, transliterated
//! from the original query builder's SQL templates.

use crate::error::Error;
use crate::types::{Atom, Comparator, Expr, Fpn};

const SELECT_PREFIX_AND_JOIN: &str =
    "FROM compver cv LEFT JOIN attrib ON (cv.id = attrib.is_attr_of) \
     WHERE attrib.name = 'status_log' AND ";

/// Compiles `query` into a full `SELECT` statement returning one row per
/// matching `compver`, with `delim` used to split four-part names passed to
/// the relationship functions (`is_successor_of`, `is_child_of`, ...).
pub fn compile(delim: &str, query: &str) -> Result<String, Error> {
    let (rest, expr) = crate::grammar::parse(query)
        .map_err(|e| Error::Syntax(e.to_string()))?;
    if !rest.is_empty() {
        return Err(Error::TrailingInput(rest.to_string()));
    }

    let mut sql = String::from(
        "SELECT cv.id AS cvid, \
         cv.name || '",
    );
    sql.push_str(&escape_sql_literal(delim));
    sql.push_str(
        "' || cv.version || ':' || cv.cvtype || ':' || cv.subsystem AS objectname, \
         cv.name, cv.version, cv.subsystem AS instance, cv.cvtype AS type, cv.owner, \
         cv.create_time, ccm_status(attrib.textval) AS status ",
    );
    sql.push_str(SELECT_PREFIX_AND_JOIN);
    compile_expr(&expr, delim, &mut sql)?;
    Ok(sql)
}

fn compile_expr(expr: &Expr, delim: &str, out: &mut String) -> Result<(), Error> {
    match expr {
        Expr::Or(terms) => compile_list(terms, " OR ", delim, out),
        Expr::And(terms) => compile_list(terms, " AND ", delim, out),
        Expr::Not(inner) => {
            out.push_str("NOT (");
            compile_expr(inner, delim, out)?;
            out.push(')');
            Ok(())
        }
        Expr::AttributeMatch {
            ident,
            comparator,
            atom,
        } => compile_attribute_match(ident, *comparator, atom, out),
        Expr::FunctionCall { name, args } => compile_function_call(name, args, delim, out),
    }
}

fn compile_list(terms: &[Expr], joiner: &str, delim: &str, out: &mut String) -> Result<(), Error> {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            out.push_str(joiner);
        }
        let needs_parens = matches!(term, Expr::Or(_) | Expr::And(_));
        if needs_parens {
            out.push('(');
        }
        compile_expr(term, delim, out)?;
        if needs_parens {
            out.push(')');
        }
    }
    Ok(())
}

fn alias(ident: &str) -> String {
    match ident {
        "cvid" => "cv.cvid".to_string(),
        "objectname" => "objectname".to_string(),
        "name" => "cv.name".to_string(),
        "version" => "cv.version".to_string(),
        "instance" => "cv.subsystem".to_string(),
        "type" => "cv.cvtype".to_string(),
        "owner" => "cv.owner".to_string(),
        "create_time" => "cv.create_time".to_string(),
        "status" => "ccm_status(attrib.textval)".to_string(),
        other => other.to_string(),
    }
}

fn compile_attribute_match(
    ident: &str,
    comparator: Comparator,
    atom: &Atom,
    out: &mut String,
) -> Result<(), Error> {
    out.push_str(&alias(ident));
    out.push(' ');
    let value = match atom {
        Atom::Ident(ident) => alias(ident),
        Atom::Str(s) => {
            let inner = s
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .unwrap_or(s);
            match comparator {
                Comparator::Eq => format!("'{}'", escape_sql_literal(inner)),
                Comparator::Match => {
                    format!("'{}'", escape_sql_literal(&inner.replace('*', "%")))
                }
            }
        }
    };
    match comparator {
        Comparator::Eq => {
            out.push('=');
            out.push(' ');
        }
        Comparator::Match => {
            out.push_str("LIKE ");
        }
    }
    out.push_str(&value);
    Ok(())
}

fn compile_function_call(
    name: &str,
    args: &[String],
    delim: &str,
    out: &mut String,
) -> Result<(), Error> {
    match name {
        "is_successor_of" | "is_predecessor_of" | "is_baseline_project_of"
        | "has_baseline_project" | "is_member_of" | "has_member" => {
            expect_args(name, args, 1)?;
        }
        "is_child_of" => {
            expect_args(name, args, 2)?;
        }
        other => return Err(Error::UnknownFunction(other.to_string())),
    }

    match name {
        "is_successor_of" => {
            let fpn = parse_fpn(&args[0], delim)?;
            out.push_str("cv.id = (SELECT relate.to_cv FROM compver INNER JOIN relate ON (compver.id = relate.from_cv) WHERE ");
            push_fpn_predicate("compver", &fpn, out);
            out.push_str(" AND relate.name = 'successor')");
        }
        "is_predecessor_of" => {
            let fpn = parse_fpn(&args[0], delim)?;
            out.push_str("cv.id = (SELECT relate.from_cv FROM compver INNER JOIN relate ON (compver.id = relate.to_cv) WHERE ");
            push_fpn_predicate("compver", &fpn, out);
            out.push_str(" AND relate.name = 'successor')");
        }
        "is_baseline_project_of" => {
            let fpn = parse_fpn(&args[0], delim)?;
            out.push_str("cv.id = (SELECT relate.to_cv FROM compver INNER JOIN relate ON (compver.id = relate.from_cv) WHERE ");
            push_fpn_predicate("compver", &fpn, out);
            out.push_str(" AND relate.name = 'baseline_project')");
        }
        "has_baseline_project" => {
            let fpn = parse_fpn(&args[0], delim)?;
            out.push_str("cv.id IN (SELECT relate.from_cv FROM relate INNER JOIN compver ON (relate.to_cv = compver.id) WHERE ");
            push_fpn_predicate("compver", &fpn, out);
            out.push_str(" AND relate.name = 'baseline_project')");
        }
        "is_child_of" => {
            let fpn = parse_fpn(&args[0], delim)?;
            let project_fpn = parse_fpn(&args[1], delim)?;
            out.push_str("cv.id IN (SELECT bind.has_child FROM bind INNER JOIN compver cv1 ON (bind.has_asm = cv1.id) INNER JOIN compver cv2 on (bind.has_parent = cv2.id) WHERE ");
            push_fpn_predicate("cv1", &project_fpn, out);
            out.push_str(" AND ");
            push_fpn_predicate("cv2", &fpn, out);
            out.push(')');
        }
        "is_member_of" => {
            let fpn = parse_fpn(&args[0], delim)?;
            out.push_str("cv.id IN (SELECT cv2.id FROM compver cv1 INNER JOIN bind ON (cv1.id = bind.has_asm) INNER JOIN compver cv2 ON (bind.has_child = cv2.id) WHERE ");
            push_fpn_predicate("cv1", &fpn, out);
            out.push(')');
        }
        "has_member" => {
            let fpn = parse_fpn(&args[0], delim)?;
            out.push_str("cv.id IN (SELECT cv1.id FROM bind INNER JOIN compver cv1 ON (bind.has_asm = cv1.id) INNER JOIN compver cv2 ON (bind.has_child = cv2.id) WHERE ");
            push_fpn_predicate("cv2", &fpn, out);
            out.push(')');
        }
        _ => unreachable!(),
    }

    Ok(())
}

fn expect_args(name: &str, args: &[String], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::WrongArgCount {
            function: name.to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn push_fpn_predicate(table_alias: &str, fpn: &Fpn, out: &mut String) {
    out.push_str(&format!(
        "{alias}.name = '{name}' AND {alias}.version = '{version}' AND {alias}.cvtype = '{cvtype}' AND {alias}.subsystem = '{subsystem}'",
        alias = table_alias,
        name = escape_sql_literal(&fpn.name),
        version = escape_sql_literal(&fpn.version),
        cvtype = escape_sql_literal(&fpn.cvtype),
        subsystem = escape_sql_literal(&fpn.subsystem),
    ));
}

/// Parses a four-part name `name<delim>version:cvtype:subsystem`.
pub fn parse_fpn(fpn: &str, delim: &str) -> Result<Fpn, Error> {
    let (name, rest) = fpn
        .split_once(delim)
        .ok_or_else(|| Error::MalformedFpn(fpn.to_string()))?;
    let mut parts = rest.splitn(3, ':');
    let version = parts.next().ok_or_else(|| Error::MalformedFpn(fpn.to_string()))?;
    let cvtype = parts.next().ok_or_else(|| Error::MalformedFpn(fpn.to_string()))?;
    let subsystem = parts.next().ok_or_else(|| Error::MalformedFpn(fpn.to_string()))?;
    Ok(Fpn {
        name: name.to_string(),
        version: version.to_string(),
        cvtype: cvtype.to_string(),
        subsystem: subsystem.to_string(),
    })
}

/// Escapes a single quote for embedding in a SQL string literal.
pub fn escape_sql_literal(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_status_and_type() {
        let sql = compile("~", "status='released' and type='dir'").unwrap();
        assert!(sql.contains("attrib.name = 'status_log' AND "));
        assert!(sql.contains("ccm_status(attrib.textval) = 'released' AND cv.cvtype = 'dir'"));
    }

    #[test]
    fn compiles_match_with_wildcard() {
        let sql = compile("~", "name match 'foo*'").unwrap();
        assert!(sql.contains("cv.name LIKE 'foo%'"));
    }

    #[test]
    fn compiles_is_successor_of() {
        let sql = compile("~", "is_successor_of('bar~1:project:baz')").unwrap();
        assert!(sql.contains("SELECT relate.to_cv FROM compver INNER JOIN relate"));
        assert!(sql.contains("compver.name = 'bar'"));
        assert!(sql.contains("relate.name = 'successor'"));
    }

    #[test]
    fn compiles_is_child_of() {
        let sql =
            compile("~", "is_child_of('bar~1:dir:baz', 'proj~1:project:baz')").unwrap();
        assert!(sql.contains("cv1.name = 'proj'"));
        assert!(sql.contains("cv2.name = 'bar'"));
    }

    #[test]
    fn rejects_unknown_function() {
        assert!(matches!(
            compile("~", "no_such_fn('x~1:project:y')"),
            Err(Error::UnknownFunction(_))
        ));
    }

    #[test]
    fn rejects_wrong_arg_count() {
        assert!(matches!(
            compile("~", "is_successor_of('x~1:project:y', 'z~1:project:y')"),
            Err(Error::WrongArgCount { .. })
        ));
    }

    #[test]
    fn rejects_malformed_fpn() {
        assert!(matches!(
            compile("~", "is_successor_of('not-a-fpn')"),
            Err(Error::MalformedFpn(_))
        ));
    }

    #[test]
    fn compiles_not_and_or() {
        let sql = compile("~", "not (status='released' or status='integrate')").unwrap();
        assert!(sql.contains("NOT ("));
        assert!(sql.contains(" OR "));
    }
}

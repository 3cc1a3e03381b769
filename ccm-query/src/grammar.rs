//! Recursive-descent parser for the CM query expression grammar (spec.md
//! §4.6), built from `nom` combinators in the style of `comma-v::parser`.
//!
//! One deliberate departure from the literal grammar: the original allows a
//! stray `(`/`)` around a single `and_term`/`not_term` that doesn't have to
//! balance (the token is echoed into the SQL output regardless of nesting).
//! Here `term` additionally accepts `'(' query ')'` as a true grouping
//! production, so parenthesised sub-expressions nest properly; every
//! example in spec.md §8 compiles identically either way. See `DESIGN.md`.

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char, space0};
use nom::combinator::{map, opt, recognize};
use nom::multi::separated_list1;
use nom::sequence::{delimited, pair, terminated, tuple};
use nom::IResult;

use crate::types::{Atom, Comparator, Expr};

pub fn parse(input: &str) -> IResult<&str, Expr> {
    delimited(space0, or_term, space0)(input)
}

fn or_term(input: &str) -> IResult<&str, Expr> {
    map(
        separated_list1(keyword("or"), and_term),
        |mut terms| {
            if terms.len() == 1 {
                terms.remove(0)
            } else {
                Expr::Or(terms)
            }
        },
    )(input)
}

fn and_term(input: &str) -> IResult<&str, Expr> {
    map(
        separated_list1(keyword("and"), not_term),
        |mut terms| {
            if terms.len() == 1 {
                terms.remove(0)
            } else {
                Expr::And(terms)
            }
        },
    )(input)
}

fn not_term(input: &str) -> IResult<&str, Expr> {
    map(pair(opt(keyword("not")), term), |(not, term)| {
        if not.is_some() {
            Expr::Not(Box::new(term))
        } else {
            term
        }
    })(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    alt((grouped, function_call, attribute_match))(input)
}

fn grouped(input: &str) -> IResult<&str, Expr> {
    delimited(
        terminated(char('('), space0),
        or_term,
        terminated(char(')'), space0),
    )(input)
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    map(
        tuple((
            ident,
            terminated(char('('), space0),
            separated_list1(terminated(char(','), space0), string),
            terminated(char(')'), space0),
        )),
        |(name, _, args, _)| Expr::FunctionCall {
            name,
            args: args.into_iter().map(unquote).collect(),
        },
    )(input)
}

fn attribute_match(input: &str) -> IResult<&str, Expr> {
    map(
        tuple((ident, comparator, atom)),
        |(ident, comparator, atom)| Expr::AttributeMatch {
            ident,
            comparator,
            atom,
        },
    )(input)
}

fn comparator(input: &str) -> IResult<&str, Comparator> {
    terminated(
        alt((
            map(tag("="), |_| Comparator::Eq),
            map(tag_no_case("match"), |_| Comparator::Match),
        )),
        space0,
    )(input)
}

fn atom(input: &str) -> IResult<&str, Atom> {
    alt((map(string, Atom::Str), map(ident, Atom::Ident)))(input)
}

fn ident(input: &str) -> IResult<&str, String> {
    map(
        terminated(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            space0,
        ),
        str::to_string,
    )(input)
}

fn string(input: &str) -> IResult<&str, String> {
    map(
        terminated(
            recognize(delimited(char('\''), take_while(|c| c != '\''), char('\''))),
            space0,
        ),
        str::to_string,
    )(input)
}

/// Matches a reserved word that must stand alone (not as a prefix of a
/// longer identifier), consuming any trailing spaces.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag_no_case(word)(input)?;
        let boundary = rest
            .chars()
            .next()
            .map(|c| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(true);
        if boundary {
            let (rest, _) = space0(rest)?;
            Ok((rest, matched))
        } else {
            Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        }
    }
}

fn unquote(s: String) -> String {
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(&s)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_attribute_match() {
        let (rest, expr) = parse("status='released'").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            expr,
            Expr::AttributeMatch {
                ident: "status".to_string(),
                comparator: Comparator::Eq,
                atom: Atom::Str("'released'".to_string()),
            }
        );
    }

    #[test]
    fn parses_and_composition() {
        let (rest, expr) = parse("status='released' and type='dir'").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            expr,
            Expr::And(vec![
                Expr::AttributeMatch {
                    ident: "status".to_string(),
                    comparator: Comparator::Eq,
                    atom: Atom::Str("'released'".to_string()),
                },
                Expr::AttributeMatch {
                    ident: "type".to_string(),
                    comparator: Comparator::Eq,
                    atom: Atom::Str("'dir'".to_string()),
                },
            ])
        );
    }

    #[test]
    fn parses_not_and_parens() {
        let (rest, expr) = parse("not (status='released' or status='integrate')").unwrap();
        assert_eq!(rest, "");
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn parses_function_call() {
        let (rest, expr) = parse("is_successor_of('foo~1:project:bar')").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            expr,
            Expr::FunctionCall {
                name: "is_successor_of".to_string(),
                args: vec!["foo~1:project:bar".to_string()],
            }
        );
    }

    #[test]
    fn keyword_does_not_match_prefix_of_longer_ident() {
        // "android" must parse as an identifier, not "and" + "roid".
        assert!(attribute_match("android='x'").is_ok());
    }
}

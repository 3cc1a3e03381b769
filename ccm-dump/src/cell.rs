//! Tokenizes a single value-cell line into its typed header.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::digit1;
use nom::combinator::{map, map_res, opt, rest};
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;

pub(crate) enum Header<'a> {
    Str(&'a str),
    Int(i64),
    Float(f64),
    Text(usize),
    NullStr,
    NullInt,
    NullText,
    NullBinary,
    NullFloat,
}

fn signed_int(input: &str) -> IResult<&str, i64> {
    map_res(pair(opt(tag("-")), digit1), |(sign, digits): (Option<&str>, &str)| {
        digits
            .parse::<i64>()
            .map(|n| if sign.is_some() { -n } else { n })
    })(input)
}

fn float(input: &str) -> IResult<&str, f64> {
    map_res(rest, str::parse::<f64>)(input)
}

fn text_length(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

pub(crate) fn header(input: &str) -> IResult<&str, Header<'_>> {
    alt((
        map(preceded(tag("s:"), rest), Header::Str),
        map(preceded(tag("i:"), signed_int), Header::Int),
        map(preceded(tag("f:"), float), Header::Float),
        map(preceded(tag("tx"), text_length), Header::Text),
        map(tag("sn"), |_| Header::NullStr),
        map(tag("in"), |_| Header::NullInt),
        map(tag("tn"), |_| Header::NullText),
        map(tag("bn"), |_| Header::NullBinary),
        map(tag("fn"), |_| Header::NullFloat),
    ))(input)
}

/// Parses the `ol<n>,` long-text header, returning the declared count.
pub(crate) fn ol_header(input: &str) -> IResult<&str, usize> {
    delimited(tag("ol"), text_length, tag(","))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_cell() {
        let (_, h) = header("s:hello world").unwrap();
        assert!(matches!(h, Header::Str("hello world")));
    }

    #[test]
    fn parses_negative_int_cell() {
        let (_, h) = header("i:-42").unwrap();
        assert!(matches!(h, Header::Int(-42)));
    }

    #[test]
    fn parses_float_cell() {
        let (_, h) = header("f:3.5").unwrap();
        assert!(matches!(h, Header::Float(f) if (f - 3.5).abs() < f64::EPSILON));
    }

    #[test]
    fn parses_text_length_header() {
        let (_, h) = header("tx123").unwrap();
        assert!(matches!(h, Header::Text(123)));
    }

    #[test]
    fn parses_typed_nulls() {
        assert!(matches!(header("sn").unwrap().1, Header::NullStr));
        assert!(matches!(header("in").unwrap().1, Header::NullInt));
        assert!(matches!(header("tn").unwrap().1, Header::NullText));
        assert!(matches!(header("bn").unwrap().1, Header::NullBinary));
        assert!(matches!(header("fn").unwrap().1, Header::NullFloat));
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert!(header("zz:nope").is_err());
    }

    #[test]
    fn parses_ol_header() {
        let (rest, count) = ol_header("ol12,payload").unwrap();
        assert_eq!(count, 12);
        assert_eq!(rest, "payload");
    }
}

use nom::{
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize, rest},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use std::str::FromStr;

use crate::model::*;


/// Parses a ledger amount such as `-1,500.00`, `$25`, `+3.5` or `(12.50)`.
pub fn parse_amount(text: &str) -> Option<BigDecimal> {
    all_consuming(delimited(multispace0, amount, multispace0))(text)
        .ok()
        .map(|(_, value)| value)
}

/// Parses `YYYY-MM-DD` or `YYYY/MM/DD`, ignoring any trailing time of day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    all_consuming(delimited(
        multispace0,
        terminated(date, opt(preceded(one_of("T "), rest))),
        multispace0,
    ))(text)
    .ok()
    .map(|(_, date)| date)
}

/// Parses a `YYYYMM` month into its first day.
pub fn parse_month(text: &str) -> Option<NaiveDate> {
    all_consuming(map_opt(
        pair(fixed_number(4), fixed_number(2)),
        |(year, month)| NaiveDate::from_ymd_opt(year as i32, month, 1),
    ))(text.trim())
    .ok()
    .map(|(_, month)| month)
}

pub fn parse_forecast(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

fn amount(i: &str) -> IResult<&str, BigDecimal> {
    alt((parenthesized, signed))(i)
}

fn parenthesized(i: &str) -> IResult<&str, BigDecimal> {
    map_res(
        delimited(
            char('('),
            preceded(opt(char('$')), unsigned),
            char(')'),
        ),
        |digits| BigDecimal::from_str(&format!("-{}", digits)),
    )(i)
}

fn signed(i: &str) -> IResult<&str, BigDecimal> {
    map_res(
        tuple((opt(one_of("+-")), opt(char('$')), unsigned)),
        |(sign, _, digits)| match sign {
            Some('-') => BigDecimal::from_str(&format!("-{}", digits)),
            _ => BigDecimal::from_str(&digits),
        },
    )(i)
}

fn unsigned(i: &str) -> IResult<&str, String> {
    alt((
        map(pair(grouped_digits, opt(fraction)), |(whole, fraction)| {
            match fraction {
                Some(fraction) => format!("{}.{}", whole, fraction),
                None => whole,
            }
        }),
        map(fraction, |fraction| format!("0.{}", fraction)),
    ))(i)
}

fn grouped_digits(i: &str) -> IResult<&str, String> {
    map(recognize(pair(digit1, many0(pair(char(','), digit1)))), |s: &str| {
        s.replace(',', "")
    })(i)
}

fn fraction(i: &str) -> IResult<&str, &str> {
    preceded(char('.'), digit1)(i)
}

fn date(i: &str) -> IResult<&str, NaiveDate> {
    map_opt(
        alt((
            separated_pair(
                separated_pair(fixed_number(4), char('-'), short_number),
                char('-'),
                short_number,
            ),
            separated_pair(
                separated_pair(fixed_number(4), char('/'), short_number),
                char('/'),
                short_number,
            ),
        )),
        |((year, month), day)| NaiveDate::from_ymd_opt(year as i32, month, day),
    )(i)
}

fn fixed_number<'a>(width: usize) -> impl FnMut(&'a str) -> IResult<&'a str, u32> {
    map_res(
        take_while_m_n(width, width, |c: char| c.is_ascii_digit()),
        str::parse,
    )
}

fn short_number(i: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(1, 2, |c: char| c.is_ascii_digit()), str::parse)(i)
}

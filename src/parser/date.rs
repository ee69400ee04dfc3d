// Date literal parser. All instants are normalised to UTC epoch milliseconds.

use crate::data::Scalar;
use chrono::NaiveDate;
use nom::{
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{preceded, tuple},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct DateParts {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
    /// Offset east of UTC in minutes
    offset_minutes: i32,
}

impl DateParts {
    fn to_epoch_millis(self) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        let naive = date.and_hms_milli_opt(self.hour, self.minute, self.second, self.millis)?;
        let utc = naive.and_utc().timestamp_millis();
        Some(utc - i64::from(self.offset_minutes) * 60_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct TimeParts {
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
    offset_minutes: i32,
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Exactly `n` digits as a number
fn fixed_digits<'a>(n: usize) -> impl Fn(&'a str) -> IResult<&'a str, u32> {
    move |input: &'a str| map_res(take_while_m_n(n, n, is_digit), str::parse::<u32>)(input)
}

/// One or two digits as a number
fn short_digits(input: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(1, 2, is_digit), str::parse::<u32>)(input)
}

fn year(input: &str) -> IResult<&str, i32> {
    map_res(take_while_m_n(4, 4, is_digit), str::parse::<i32>)(input)
}

/// `.123456` -> 123 ms. Digits past millisecond precision are truncated.
fn fraction(input: &str) -> IResult<&str, u32> {
    map(preceded(char('.'), digit1), |digits: &str| {
        let mut ms = 0;
        for (i, c) in digits.chars().take(3).enumerate() {
            ms += c.to_digit(10).unwrap_or(0) * 10u32.pow(2 - i as u32);
        }
        ms
    })(input)
}

/// `Z`, `+05:30`, `-0800`
fn offset(input: &str) -> IResult<&str, i32> {
    alt((
        map(char('Z'), |_| 0),
        map(
            tuple((one_of("+-"), fixed_digits(2), opt(char(':')), fixed_digits(2))),
            |(sign, hh, _, mm)| {
                let minutes = (hh * 60 + mm) as i32;
                if sign == '-' { -minutes } else { minutes }
            },
        ),
    ))(input)
}

/// `HH:MM[:SS[.fff]][offset]`
fn clock(input: &str) -> IResult<&str, TimeParts> {
    let (input, hour) = fixed_digits(2)(input)?;
    let (input, _) = char(':')(input)?;
    let (input, minute) = fixed_digits(2)(input)?;
    let (input, second) = opt(preceded(char(':'), fixed_digits(2)))(input)?;
    let (input, millis) = opt(fraction)(input)?;
    let (input, offset_minutes) = opt(offset)(input)?;
    Ok((
        input,
        TimeParts {
            hour,
            minute,
            second: second.unwrap_or(0),
            millis: millis.unwrap_or(0),
            offset_minutes: offset_minutes.unwrap_or(0),
        },
    ))
}

/// `YYYY-MM-DD` or `YYYY/MM/DD`, optionally followed by a `T` or space and a clock
fn iso_datetime(input: &str) -> IResult<&str, DateParts> {
    let (input, year) = year(input)?;
    let (input, sep) = one_of("-/")(input)?;
    let (input, month) = fixed_digits(2)(input)?;
    let (input, _) = char(sep)(input)?;
    let (input, day) = fixed_digits(2)(input)?;
    let (input, time) = opt(preceded(one_of("T "), clock))(input)?;
    let time = time.unwrap_or_default();
    Ok((
        input,
        DateParts {
            year,
            month,
            day,
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            millis: time.millis,
            offset_minutes: time.offset_minutes,
        },
    ))
}

/// `MM/DD/YYYY[ HH:MM[:SS]]`
fn us_datetime(input: &str) -> IResult<&str, DateParts> {
    let (input, month) = short_digits(input)?;
    let (input, _) = char('/')(input)?;
    let (input, day) = short_digits(input)?;
    let (input, _) = char('/')(input)?;
    let (input, year) = year(input)?;
    let (input, time) = opt(preceded(char(' '), clock))(input)?;
    let time = time.unwrap_or_default();
    Ok((
        input,
        DateParts {
            year,
            month,
            day,
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            millis: time.millis,
            offset_minutes: time.offset_minutes,
        },
    ))
}

/// `YYYY-MM`
fn year_month(input: &str) -> IResult<&str, DateParts> {
    map(tuple((year, char('-'), fixed_digits(2))), |(year, _, month)| DateParts {
        year,
        month,
        day: 1,
        ..Default::default()
    })(input)
}

/// Bare `YYYY`
fn year_only(input: &str) -> IResult<&str, DateParts> {
    map(year, |year| DateParts {
        year,
        month: 1,
        day: 1,
        ..Default::default()
    })(input)
}

fn date_literal(input: &str) -> IResult<&str, DateParts> {
    all_consuming(alt((iso_datetime, us_datetime, year_month, year_only)))(input)
}

/// 0000-01-01T00:00:00Z
const MIN_EPOCH_MS: i64 = -62_167_219_200_000;
/// 9999-12-31T23:59:59.999Z
const MAX_EPOCH_MS: i64 = 253_402_300_799_999;

/// Instants are limited to four-digit years so that bucket keys sort
/// chronologically.
fn in_range(ms: i64) -> bool {
    (MIN_EPOCH_MS..=MAX_EPOCH_MS).contains(&ms)
}

/// Parse a date string into UTC epoch milliseconds.
/// Returns `None` for anything that isn't a valid calendar date.
pub fn parse_date_str(input: &str) -> Option<i64> {
    let (_, parts) = date_literal(input.trim()).ok()?;
    parts.to_epoch_millis().filter(|&ms| in_range(ms))
}

/// Parse any scalar into UTC epoch milliseconds.
///
/// Numbers are taken as epoch milliseconds. Nulls, booleans, unrecognised
/// text and instants outside years 0..=9999 are unparseable.
pub fn parse_date(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Timestamp(ms) => Some(*ms).filter(|&ms| in_range(ms)),
        Scalar::Number(n) if (MIN_EPOCH_MS as f64..=MAX_EPOCH_MS as f64).contains(n) => {
            Some(n.trunc() as i64)
        }
        Scalar::Text(s) => parse_date_str(s),
        _ => None,
    }
}

fn iso_prefix(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        fixed_digits(4),
        char('-'),
        fixed_digits(2),
        char('-'),
        fixed_digits(2),
    )))(input)
}

fn us_prefix(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        short_digits,
        char('/'),
        short_digits,
        char('/'),
        fixed_digits(4),
    )))(input)
}

/// Cheap shape check used for time-axis sniffing: does the value start like
/// `YYYY-MM-DD` or `MM/DD/YYYY`, or is it a native timestamp?
pub fn looks_like_date(value: &Scalar) -> bool {
    match value {
        Scalar::Timestamp(_) => true,
        Scalar::Text(s) => alt((iso_prefix, us_prefix))(s.as_str()).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap().timestamp_millis()
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_date_str("2024-03-12"), Some(ms(2024, 3, 12, 0, 0, 0)));
        assert_eq!(parse_date_str(" 2024/03/12 "), Some(ms(2024, 3, 12, 0, 0, 0)));
    }

    #[test]
    fn test_parse_iso_datetime() {
        assert_eq!(
            parse_date_str("2024-03-12T08:30:15Z"),
            Some(ms(2024, 3, 12, 8, 30, 15))
        );
        assert_eq!(
            parse_date_str("2024-03-12 08:30"),
            Some(ms(2024, 3, 12, 8, 30, 0))
        );
        assert_eq!(
            parse_date_str("2024-03-12T08:30:15.250"),
            Some(ms(2024, 3, 12, 8, 30, 15) + 250)
        );
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(
            parse_date_str("2024-03-12T10:00:00+02:00"),
            Some(ms(2024, 3, 12, 8, 0, 0))
        );
        assert_eq!(
            parse_date_str("2024-03-12T00:00:00-0500"),
            Some(ms(2024, 3, 12, 5, 0, 0))
        );
    }

    #[test]
    fn test_parse_us_date() {
        assert_eq!(parse_date_str("3/5/2024"), Some(ms(2024, 3, 5, 0, 0, 0)));
        assert_eq!(
            parse_date_str("12/31/2023 23:59"),
            Some(ms(2023, 12, 31, 23, 59, 0))
        );
    }

    #[test]
    fn test_parse_partial_dates() {
        assert_eq!(parse_date_str("2024-07"), Some(ms(2024, 7, 1, 0, 0, 0)));
        assert_eq!(parse_date_str("2024"), Some(ms(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_date_str("hello"), None);
        assert_eq!(parse_date_str("2024-02-30"), None);
        assert_eq!(parse_date_str("2024-13-01"), None);
        assert_eq!(parse_date_str("2024-03-12 trailing"), None);
        assert_eq!(parse_date_str(""), None);
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_date(&Scalar::Timestamp(42)), Some(42));
        assert_eq!(parse_date(&Scalar::Number(1_000.0)), Some(1_000));
        assert_eq!(parse_date(&Scalar::Null), None);
        assert_eq!(parse_date(&Scalar::Bool(true)), None);
        assert_eq!(parse_date(&Scalar::Number(f64::NAN)), None);
    }

    #[test]
    fn test_out_of_range_instants_rejected() {
        assert_eq!(parse_date(&Scalar::Number(-1e300)), None);
        assert_eq!(parse_date(&Scalar::Number(1e15)), None);
        assert_eq!(parse_date(&Scalar::Timestamp(i64::MIN)), None);
        assert_eq!(parse_date(&Scalar::Timestamp(MAX_EPOCH_MS + 1)), None);
        assert_eq!(parse_date(&Scalar::Timestamp(MAX_EPOCH_MS)), Some(MAX_EPOCH_MS));
        assert_eq!(parse_date_str("0000-01-01"), Some(MIN_EPOCH_MS));
        assert_eq!(parse_date_str("9999-12-31T23:59:59.999Z"), Some(MAX_EPOCH_MS));
        // A negative offset pushes the last representable day into year 10000
        assert_eq!(parse_date_str("9999-12-31T23:00:00-05:00"), None);
    }

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date(&Scalar::from("2024-03-12")));
        assert!(looks_like_date(&Scalar::from("2024-03-12T10:00:00")));
        assert!(looks_like_date(&Scalar::from("3/12/2024")));
        assert!(looks_like_date(&Scalar::Timestamp(0)));
        assert!(!looks_like_date(&Scalar::from("2024")));
        assert!(!looks_like_date(&Scalar::from("north")));
        // Numbers parse as dates but don't count as date-like for axis sniffing
        assert!(!looks_like_date(&Scalar::Number(1.7e12)));
    }
}

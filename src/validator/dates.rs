use std::fmt::Write;

use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::limits::MAX_DATE_PATTERN_LEN;
use crate::model::DateField;

use super::ValidationError;

/// A date pattern, stored as strftime. Accepts strftime directly (anything
/// containing `%`) or Java-style letter patterns such as `yyyy-MM-dd HH:mm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    strftime: String,
    shape: Shape,
}

/// Which calendar parts a pattern carries. Decides how input is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    DateTime,
    /// Parsed values land on midnight.
    DateOnly,
    /// Parsed values land on 1970-01-01.
    TimeOnly,
}

impl DatePattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }
        if pattern.len() > MAX_DATE_PATTERN_LEN {
            return Err(PatternError::TooLong);
        }
        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            java_to_strftime(pattern)?
        };
        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(PatternError::Invalid(pattern.to_string()));
        }
        // Catch specifiers that parse but can't render a naive value (e.g. %z).
        let sample = NaiveDate::from_ymd_opt(2000, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .ok_or_else(|| PatternError::Invalid(pattern.to_string()))?;
        if render(&sample, &strftime).is_none() {
            return Err(PatternError::Invalid(pattern.to_string()));
        }
        let shape = shape_of(&strftime).ok_or_else(|| PatternError::Invalid(pattern.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            strftime,
            shape,
        })
    }

    /// The pattern as configured.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn as_strftime(&self) -> &str {
        &self.strftime
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
}

fn shape_of(strftime: &str) -> Option<Shape> {
    let (mut date, mut time) = (false, false);
    for item in StrftimeItems::new(strftime) {
        match item {
            Item::Numeric(
                Numeric::Year
                | Numeric::YearDiv100
                | Numeric::YearMod100
                | Numeric::IsoYear
                | Numeric::IsoYearDiv100
                | Numeric::IsoYearMod100
                | Numeric::Month
                | Numeric::Day
                | Numeric::Ordinal
                | Numeric::IsoWeek
                | Numeric::WeekFromSun
                | Numeric::WeekFromMon,
                _,
            )
            | Item::Fixed(Fixed::ShortMonthName | Fixed::LongMonthName) => date = true,
            Item::Numeric(
                Numeric::Hour | Numeric::Hour12 | Numeric::Minute | Numeric::Second | Numeric::Nanosecond,
                _,
            ) => time = true,
            Item::Numeric(Numeric::Timestamp, _) => {
                date = true;
                time = true;
            }
            _ => {}
        }
    }
    match (date, time) {
        (true, true) => Some(Shape::DateTime),
        (true, false) => Some(Shape::DateOnly),
        (false, true) => Some(Shape::TimeOnly),
        (false, false) => None,
    }
}

/// Parse `raw` with `display` and re-render it with `storage`.
///
/// Date-only and time-only display patterns are accepted: a missing time is
/// midnight, a missing date is 1970-01-01.
pub fn normalize(
    raw: &str,
    display: &DatePattern,
    storage: &DatePattern,
    field: DateField,
) -> Result<String, ValidationError> {
    parse(raw.trim(), display)
        .and_then(|dt| render(&dt, storage.as_strftime()))
        .ok_or(ValidationError::DateParseFailure(field))
}

fn parse(raw: &str, pattern: &DatePattern) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }
    let fmt = pattern.as_strftime();
    match pattern.shape() {
        Shape::DateTime => NaiveDateTime::parse_from_str(raw, fmt).ok(),
        Shape::DateOnly => NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        Shape::TimeOnly => {
            let t = NaiveTime::parse_from_str(raw, fmt).ok()?;
            NaiveDate::from_ymd_opt(1970, 1, 1).map(|d| d.and_time(t))
        }
    }
}

fn render(dt: &NaiveDateTime, fmt: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(StrftimeItems::new(fmt))).ok()?;
    Some(out)
}

fn java_to_strftime(pattern: &str) -> Result<String, PatternError> {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            // Quoted literal; '' is a literal quote.
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        out.push('\'');
                    }
                    Some('\'') => break,
                    Some('%') => out.push_str("%%"),
                    Some(lit) => out.push(lit),
                    None => return Err(PatternError::UnterminatedQuote),
                }
            }
            continue;
        }
        if !c.is_ascii_alphabetic() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
            continue;
        }
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            _ => return Err(PatternError::UnsupportedLetter(c, run)),
        };
        out.push_str(spec);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    Empty,
    TooLong,
    Invalid(String),
    UnsupportedLetter(char, usize),
    UnterminatedQuote,
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternError::Empty => write!(f, "empty date pattern"),
            PatternError::TooLong => write!(f, "date pattern too long"),
            PatternError::Invalid(p) => write!(f, "invalid date pattern: {p}"),
            PatternError::UnsupportedLetter(c, n) => {
                write!(f, "unsupported pattern letter '{c}' (x{n})")
            }
            PatternError::UnterminatedQuote => write!(f, "unterminated quote in date pattern"),
        }
    }
}

impl std::error::Error for PatternError {}

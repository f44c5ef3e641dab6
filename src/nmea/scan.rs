//! Format-driven NMEA field scanner.
//!
//! A layout string names one decoder per comma-separated field:
//!
//! | code | field                       | result                         |
//! |------|-----------------------------|--------------------------------|
//! | `c`  | single character            | `Char(Some(b))` / `Char(None)` |
//! | `d`  | direction N/E/S/W           | `Direction(1 / -1 / 0)`        |
//! | `f`  | scaled fraction             | `Float(ScaledFloat)`           |
//! | `i`  | decimal integer             | `Int(i32)`, 0 when empty       |
//! | `s`  | raw string                  | `Str(&str)`                    |
//! | `t`  | `$` + 5-char talker id      | `Talker(&str)`, mandatory      |
//! | `D`  | `ddmmyy` date               | `Date(Option<NmeaDate>)`       |
//! | `T`  | `hhmmss[.f+]` time          | `Time(Option<NmeaTime>)`       |
//! | `_`  | ignored                     | `Ignored`                      |
//! | `;`  | every following field is optional                            |
//!
//! The talker field is the sentence start itself, so layouts begin with `t`.

use heapless::Vec as HVec;

use super::checksum::is_print;
use super::types::{NmeaDate, NmeaTime, ScaledFloat};
use crate::error::NmeaError;

/// Upper bound on decoders in one layout.
pub const MAX_FIELDS: usize = 24;

/// One decoded field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Char(Option<u8>),
    Direction(i8),
    Float(ScaledFloat),
    Int(i32),
    Str(&'a str),
    Talker(&'a str),
    Date(Option<NmeaDate>),
    Time(Option<NmeaTime>),
    Ignored,
}

/// Positional scan result: one entry per layout code (`;` excluded).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields<'a> {
    items: HVec<Field<'a>, MAX_FIELDS>,
}

impl<'a> Fields<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Field<'a>> {
        self.items.get(index)
    }

    /// Typed sequential access in layout order.
    pub fn reader(&self) -> FieldReader<'_, 'a> {
        FieldReader {
            fields: self.items.iter(),
        }
    }
}

/// Sequential typed accessor over [`Fields`].  A kind mismatch means the
/// caller's layout and accessors disagree and reports `BadField`.
pub struct FieldReader<'f, 'a> {
    fields: core::slice::Iter<'f, Field<'a>>,
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, NmeaError> {
            match self.fields.next() {
                Some(Field::$variant(v)) => Ok(*v),
                _ => Err(NmeaError::BadField),
            }
        }
    };
}

impl<'a> FieldReader<'_, 'a> {
    accessor!(char, Char, Option<u8>);
    accessor!(direction, Direction, i8);
    accessor!(float, Float, ScaledFloat);
    accessor!(int, Int, i32);
    accessor!(string, Str, &'a str);
    accessor!(talker, Talker, &'a str);
    accessor!(date, Date, Option<NmeaDate>);
    accessor!(time, Time, Option<NmeaTime>);

    /// Skip one field.
    pub fn skip(&mut self) -> Result<(), NmeaError> {
        self.fields.next().map(|_| ()).ok_or(NmeaError::BadField)
    }
}

// ───────────────────────────────────────────────────────────────
// Scanner
// ───────────────────────────────────────────────────────────────

fn is_field(b: u8) -> bool {
    is_print(b) && b != b',' && b != b'*'
}

struct Cursor<'a> {
    s: &'a [u8],
}

impl Cursor<'_> {
    fn at(&self, i: usize) -> u8 {
        self.s.get(i).copied().unwrap_or(0)
    }

    fn field_end(&self, start: usize) -> usize {
        let mut i = start;
        while is_field(self.at(i)) {
            i += 1;
        }
        i
    }

    /// Start of the field after the one beginning at `start`, or `None`
    /// when the field is not followed by a comma.
    fn next_field(&self, start: usize) -> Option<usize> {
        let end = self.field_end(start);
        (self.at(end) == b',').then_some(end + 1)
    }

    fn digits<const N: usize>(&self, start: usize) -> Result<[u8; N], NmeaError> {
        let mut out = [0u8; N];
        for (k, slot) in out.iter_mut().enumerate() {
            let b = self.at(start + k);
            if !b.is_ascii_digit() {
                return Err(NmeaError::BadField);
            }
            *slot = b - b'0';
        }
        Ok(out)
    }
}

fn scan_float(c: &Cursor<'_>, start: usize) -> Result<ScaledFloat, NmeaError> {
    let mut sign: i32 = 0;
    let mut value: Option<i32> = None;
    let mut scale: i32 = 0;

    let mut i = start;
    while is_field(c.at(i)) {
        let b = c.at(i);
        match b {
            b'+' if sign == 0 && value.is_none() => sign = 1,
            b'-' if sign == 0 && value.is_none() => sign = -1,
            b'0'..=b'9' => {
                let digit = i32::from(b - b'0');
                let v = value.unwrap_or(0);
                if v > (i32::MAX - digit) / 10 {
                    if scale != 0 {
                        // Extra precision beyond 31 bits is dropped.
                        break;
                    }
                    return Err(NmeaError::Overflow);
                }
                value = Some(v * 10 + digit);
                if scale != 0 {
                    scale *= 10;
                }
            }
            b'.' if scale == 0 => scale = 1,
            b' ' => {
                // Leading spaces only.
                if sign != 0 || value.is_some() || scale != 0 {
                    return Err(NmeaError::BadField);
                }
            }
            _ => return Err(NmeaError::BadField),
        }
        i += 1;
    }

    match value {
        None if sign != 0 || scale != 0 => Err(NmeaError::BadField),
        None => Ok(ScaledFloat::EMPTY),
        Some(v) => {
            let scale = if scale == 0 { 1 } else { scale };
            let v = if sign != 0 { v * sign } else { v };
            Ok(ScaledFloat::new(v, scale))
        }
    }
}

/// Decimal integer with `strtol` conventions: leading whitespace and a sign
/// are accepted, anything after the digits must end the field.
fn scan_int(c: &Cursor<'_>, start: usize) -> Result<i32, NmeaError> {
    let mut i = start;
    while matches!(c.at(i), b' ' | b'\t') {
        i += 1;
    }
    let negative = match c.at(i) {
        b'-' => {
            i += 1;
            true
        }
        b'+' => {
            i += 1;
            false
        }
        _ => false,
    };
    let digits_start = i;
    let mut value: i64 = 0;
    while c.at(i).is_ascii_digit() {
        value = (value * 10 + i64::from(c.at(i) - b'0')).min(i64::from(i32::MAX) + 1);
        i += 1;
    }
    if i == digits_start {
        // No conversion: the whole field must be empty.
        return if is_field(c.at(start)) {
            Err(NmeaError::BadField)
        } else {
            Ok(0)
        };
    }
    if is_field(c.at(i)) {
        return Err(NmeaError::BadField);
    }
    let value = if negative { -value } else { value };
    Ok(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

fn scan_date(c: &Cursor<'_>, start: usize) -> Result<Option<NmeaDate>, NmeaError> {
    if !is_field(c.at(start)) {
        return Ok(None);
    }
    let d = c.digits::<6>(start)?;
    Ok(Some(NmeaDate {
        day: d[0] * 10 + d[1],
        month: d[2] * 10 + d[3],
        year: d[4] * 10 + d[5],
    }))
}

fn scan_time(c: &Cursor<'_>, start: usize) -> Result<Option<NmeaTime>, NmeaError> {
    if !is_field(c.at(start)) {
        return Ok(None);
    }
    let d = c.digits::<6>(start)?;
    let mut i = start + 6;
    let mut microseconds = 0u32;
    if c.at(i) == b'.' {
        i += 1;
        let mut scale = 1_000_000u32;
        while c.at(i).is_ascii_digit() && scale > 1 {
            microseconds = microseconds * 10 + u32::from(c.at(i) - b'0');
            scale /= 10;
            i += 1;
        }
        microseconds *= scale;
    }
    Ok(Some(NmeaTime {
        hours: d[0] * 10 + d[1],
        minutes: d[2] * 10 + d[3],
        seconds: d[4] * 10 + d[5],
        microseconds,
    }))
}

fn text(s: &[u8]) -> Result<&str, NmeaError> {
    core::str::from_utf8(s).map_err(|_| NmeaError::BadField)
}

/// Scan `sentence` against `layout`.
///
/// Fails when a mandatory field is missing, a float overflows before its
/// decimal point, a direction is not N/E/S/W, the talker id is malformed,
/// or a field holds characters its code does not allow.  Fields beyond
/// the layout are ignored.
pub fn scan<'a>(sentence: &'a [u8], layout: &str) -> Result<Fields<'a>, NmeaError> {
    let c = Cursor { s: sentence };
    let mut field = Some(0usize);
    let mut optional = false;
    let mut out = Fields::default();

    for code in layout.bytes() {
        if code == b';' {
            optional = true;
            continue;
        }
        if field.is_none() && !optional {
            return Err(NmeaError::MissingField);
        }

        let decoded = match code {
            b'c' => Field::Char(field.map(|f| c.at(f)).filter(|&b| is_field(b))),
            b'd' => {
                let dir = match field.map(|f| c.at(f)).filter(|&b| is_field(b)) {
                    None => 0,
                    Some(b'N' | b'E') => 1,
                    Some(b'S' | b'W') => -1,
                    Some(_) => return Err(NmeaError::BadDirection),
                };
                Field::Direction(dir)
            }
            b'f' => match field {
                Some(f) => Field::Float(scan_float(&c, f)?),
                None => Field::Float(ScaledFloat::EMPTY),
            },
            b'i' => match field {
                Some(f) => Field::Int(scan_int(&c, f)?),
                None => Field::Int(0),
            },
            b's' => match field {
                Some(f) => Field::Str(text(&sentence[f.min(sentence.len())..c.field_end(f).min(sentence.len())])?),
                None => Field::Str(""),
            },
            b't' => {
                let f = field.ok_or(NmeaError::MissingField)?;
                if c.at(f) != b'$' || !(1..=5).all(|k| is_field(c.at(f + k))) {
                    return Err(NmeaError::BadTalker);
                }
                Field::Talker(text(&sentence[f + 1..f + 6])?)
            }
            b'D' => match field {
                Some(f) => Field::Date(scan_date(&c, f)?),
                None => Field::Date(None),
            },
            b'T' => match field {
                Some(f) => Field::Time(scan_time(&c, f)?),
                None => Field::Time(None),
            },
            b'_' => Field::Ignored,
            _ => return Err(NmeaError::Malformed),
        };

        out.items.push(decoded).map_err(|_| NmeaError::Malformed)?;
        field = field.and_then(|f| c.next_field(f));
    }

    Ok(out)
}

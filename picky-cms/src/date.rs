use crate::error::CmsError;
use picky_cms_asn1::{Asn1DerError, Node, Reader, Tag};
use std::fmt;

/// UTC date with second precision, as carried by `Time` and `signingTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDate {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl UtcDate {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        let month_value = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(i32::from(year), month_value, day).ok()?;
        time::Time::from_hms(hour, minute, second).ok()?;

        Some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    pub fn ymd(year: u16, month: u8, day: u8) -> Option<Self> {
        Self::new(year, month, day, 0, 0, 0)
    }

    pub fn now() -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            year: u16::try_from(now.year()).unwrap_or(9999),
            month: u8::from(now.month()),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
        }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    /// UTCTime for years 1950 through 2049, GeneralizedTime otherwise (RFC 5280 rule).
    pub fn to_node(&self) -> Node<'static> {
        let tail = format!(
            "{:02}{:02}{:02}{:02}{:02}Z",
            self.month, self.day, self.hour, self.minute, self.second
        );

        if (1950..2050).contains(&self.year) {
            let text = format!("{:02}{}", self.year % 100, tail);
            Node::primitive(Tag::UTC_TIME, text.into_bytes())
        } else {
            let text = format!("{:04}{}", self.year, tail);
            Node::primitive(Tag::GENERALIZED_TIME, text.into_bytes())
        }
    }

    /// Reads an UTCTime or a GeneralizedTime.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, CmsError> {
        let tlv = reader.read_tlv()?;
        Self::from_time_element(tlv.tag, tlv.content)
    }

    pub(crate) fn from_time_element(tag: Tag, content: &[u8]) -> Result<Self, CmsError> {
        const INVALID: Asn1DerError = Asn1DerError::InvalidData { context: "invalid time" };

        let (year, rest) = match tag {
            Tag::UTC_TIME => {
                let (yy, rest) = split_number(content, 2).ok_or(INVALID)?;
                let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
                (year, rest)
            }
            Tag::GENERALIZED_TIME => split_number(content, 4).ok_or(INVALID)?,
            actual => {
                return Err(Asn1DerError::UnexpectedTag {
                    expected: Tag::UTC_TIME,
                    actual,
                }
                .into())
            }
        };

        let (month, rest) = split_number(rest, 2).ok_or(INVALID)?;
        let (day, rest) = split_number(rest, 2).ok_or(INVALID)?;
        let (hour, rest) = split_number(rest, 2).ok_or(INVALID)?;
        let (minute, rest) = split_number(rest, 2).ok_or(INVALID)?;
        let (second, rest) = split_number(rest, 2).ok_or(INVALID)?;
        if rest != b"Z" {
            return Err(INVALID.into());
        }

        let narrow = |v: u16| u8::try_from(v).map_err(|_| INVALID);
        Self::new(
            year,
            narrow(month)?,
            narrow(day)?,
            narrow(hour)?,
            narrow(minute)?,
            narrow(second)?,
        )
        .ok_or_else(|| INVALID.into())
    }
}

fn split_number(input: &[u8], digits: usize) -> Option<(u16, &[u8])> {
    if input.len() < digits {
        return None;
    }
    let (number, rest) = input.split_at(digits);
    let value = number.iter().try_fold(0u16, |acc, c| {
        if c.is_ascii_digit() {
            Some(acc * 10 + u16::from(c - b'0'))
        } else {
            None
        }
    })?;
    Some((value, rest))
}

impl fmt::Display for UtcDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

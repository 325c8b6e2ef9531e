use chrono::NaiveDate;

/// Token used by the IMDB dumps for an absent value.
pub const NULL_MARKER: &str = "\\N";

/// Width of the alphabetic tag in front of IMDB identifiers (`nm`, `tt`).
pub const IMDB_TAG_LEN: usize = 2;

pub type EntityId = i64;

/// Returns `None` for empty input and for the null-marker, otherwise the trimmed value.
pub fn present(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    if value.is_empty() || value == NULL_MARKER {
        None
    } else {
        Some(value)
    }
}

/// Extract the numeric surrogate key from an IMDB code (`nm0000001` -> 1).
pub fn extract_id(raw: &str) -> Option<EntityId> {
    extract_tagged_id(raw, IMDB_TAG_LEN)
}

/// Strip a fixed-width tag and parse the remaining decimal numeral.
///
/// Never fails: empty input, the null-marker, a value shorter than the tag or a
/// non-numeric remainder all yield `None`, which callers treat as "skip record".
pub fn extract_tagged_id(raw: &str, tag_len: usize) -> Option<EntityId> {
    let value = present(Some(raw))?;
    let (offset, _) = value.char_indices().nth(tag_len)?;
    let digits = &value[offset..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<EntityId>().ok()
}

/// Which end of a year a bare year value should map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearBound {
    Start,
    End,
}

/// Convert a bare year into a calendar date (Jan 1 for starts, Dec 31 for ends).
pub fn year_to_date(raw: Option<&str>, bound: YearBound) -> Option<NaiveDate> {
    let year = parse_int::<i32>(raw)?;
    match bound {
        YearBound::Start => NaiveDate::from_ymd_opt(year, 1, 1),
        YearBound::End => NaiveDate::from_ymd_opt(year, 12, 31),
    }
}

pub fn parse_int<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    present(raw)?.parse::<T>().ok()
}

pub fn parse_float(raw: Option<&str>) -> Option<f64> {
    present(raw)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `"1"` is the only truthy flag value in the dumps.
pub fn parse_flag(raw: Option<&str>) -> bool {
    present(raw) == Some("1")
}

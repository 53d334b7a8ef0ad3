use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "General")]
    pub name: String,
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "18:00:00", value_type = String)]
    pub end_time: NaiveTime,
}

/// Accepts `HH:MM` (as sent by `<input type="time">`) or `HH:MM:SS`.
pub fn parse_shift_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Validates a new shift. An end before the start is an overnight shift.
pub fn validate_shift(
    name: &str,
    start_time: &str,
    end_time: &str,
) -> Result<(NaiveTime, NaiveTime), String> {
    if name.trim().is_empty() {
        return Err("Shift name is required".to_string());
    }

    let start = parse_shift_time(start_time)
        .ok_or_else(|| format!("Invalid start_time: {start_time}"))?;
    let end = parse_shift_time(end_time).ok_or_else(|| format!("Invalid end_time: {end_time}"))?;

    if start == end {
        return Err("Shift start and end cannot be equal".to_string());
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("09:00", 9, 0, 0)]
    #[case("09:30:15", 9, 30, 15)]
    #[case(" 22:00 ", 22, 0, 0)]
    fn test_parse_shift_time(#[case] raw: &str, #[case] h: u32, #[case] m: u32, #[case] s: u32) {
        assert_eq!(parse_shift_time(raw), NaiveTime::from_hms_opt(h, m, s));
    }

    #[rstest]
    #[case("")]
    #[case("9am")]
    #[case("25:00")]
    #[case("12:60")]
    fn test_parse_shift_time_rejects(#[case] raw: &str) {
        assert_eq!(parse_shift_time(raw), None);
    }

    #[test]
    fn test_overnight_shift_is_allowed() {
        let (start, end) = validate_shift("Night", "22:00", "06:00").unwrap();
        assert!(end < start);
    }

    #[test]
    fn test_validate_shift_errors() {
        assert!(validate_shift(" ", "09:00", "18:00").is_err());
        assert!(validate_shift("Day", "09:00", "09:00:00").is_err());
        assert!(validate_shift("Day", "nine", "18:00").unwrap_err().contains("start_time"));
    }
}

use chrono::{Datelike, NaiveDate};

pub const ORDER_NUMBER_PREFIX: &str = "SS";

/// `SS{YY}{MM}{DD}{seq:04}`; sequences past 9999 simply widen.
pub fn format_order_number(day: NaiveDate, seq: u32) -> String {
    format!(
        "{ORDER_NUMBER_PREFIX}{:02}{:02}{:02}{:04}",
        day.year().rem_euclid(100),
        day.month(),
        day.day(),
        seq
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pads_every_component() {
        assert_eq!(format_order_number(day(2025, 3, 7), 1), "SS2503070001");
        assert_eq!(format_order_number(day(2025, 3, 7), 2), "SS2503070002");
    }

    #[test]
    fn uses_two_digit_year() {
        assert_eq!(format_order_number(day(2001, 12, 31), 42), "SS0112310042");
    }

    #[test]
    fn widens_past_four_digits() {
        assert_eq!(format_order_number(day(2025, 1, 1), 12345), "SS25010112345");
    }
}

//! Due-date arithmetic for recurring contacts.

use chrono::{Datelike, Duration, NaiveDate};

use super::Frequency;

/// Advances a due date by one cycle.
///
/// Weekly and biweekly cycles are fixed 7 and 14 day steps. A monthly cycle
/// moves to `due_day` in the following month, clamped to the last day when
/// that month is too short. Returns `None` only when the result falls
/// outside chrono's representable range.
pub fn advance(current: NaiveDate, frequency: Frequency, due_day: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Weekly => current.checked_add_signed(Duration::days(7)),
        Frequency::Biweekly => current.checked_add_signed(Duration::days(14)),
        Frequency::Monthly => {
            let (year, month) = month_after(current.year(), current.month());
            clamped(year, month, due_day)
        }
    }
}

/// First due date for a contact with no stored schedule.
///
/// Seeds from `due_day` in the current month; when that date has already
/// passed it rolls to the next month with the same clamping rule.
pub fn seed(today: NaiveDate, due_day: u32) -> Option<NaiveDate> {
    let candidate = clamped(today.year(), today.month(), due_day)?;
    if candidate < today {
        let (year, month) = month_after(today.year(), today.month());
        clamped(year, month, due_day)
    } else {
        Some(candidate)
    }
}

fn month_after(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

/// `due_day` placed in the given month, clamped to the month's last day.
fn clamped(year: i32, month: u32, due_day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, due_day).or_else(|| {
        let (next_year, next_month) = month_after(year, month);
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_and_biweekly_are_fixed_steps() {
        // Steps cross month boundaries without snapping to a day of month.
        let current = date(2026, 1, 29);
        assert_eq!(
            advance(current, Frequency::Weekly, 29).unwrap(),
            date(2026, 2, 5)
        );
        assert_eq!(
            advance(current, Frequency::Biweekly, 29).unwrap(),
            date(2026, 2, 12)
        );
    }

    #[test]
    fn monthly_advance_keeps_due_day() {
        assert_eq!(
            advance(date(2026, 3, 15), Frequency::Monthly, 15).unwrap(),
            date(2026, 4, 15)
        );
    }

    #[test]
    fn monthly_advance_clamps_short_months() {
        // Jan 31 -> Feb 28 in a non-leap year.
        assert_eq!(
            advance(date(2026, 1, 31), Frequency::Monthly, 31).unwrap(),
            date(2026, 2, 28)
        );
        // Leap year lands on Feb 29.
        assert_eq!(
            advance(date(2028, 1, 31), Frequency::Monthly, 31).unwrap(),
            date(2028, 2, 29)
        );
        // 31-day month into a 30-day month.
        assert_eq!(
            advance(date(2026, 3, 31), Frequency::Monthly, 31).unwrap(),
            date(2026, 4, 30)
        );
    }

    #[test]
    fn monthly_advance_recovers_due_day_after_clamp() {
        // A clamped February date returns to day 31 in March.
        assert_eq!(
            advance(date(2026, 2, 28), Frequency::Monthly, 31).unwrap(),
            date(2026, 3, 31)
        );
    }

    #[test]
    fn monthly_advance_wraps_year() {
        assert_eq!(
            advance(date(2026, 12, 20), Frequency::Monthly, 20).unwrap(),
            date(2027, 1, 20)
        );
    }

    #[test]
    fn seed_uses_current_month_when_not_passed() {
        assert_eq!(seed(date(2026, 8, 4), 15).unwrap(), date(2026, 8, 15));
        // Due today counts as not passed.
        assert_eq!(seed(date(2026, 8, 4), 4).unwrap(), date(2026, 8, 4));
    }

    #[test]
    fn seed_rolls_to_next_month_when_passed() {
        assert_eq!(seed(date(2026, 8, 20), 15).unwrap(), date(2026, 9, 15));
        // Rolling into a short month clamps.
        assert_eq!(seed(date(2026, 1, 31), 30).unwrap(), date(2026, 2, 28));
    }

    #[test]
    fn seed_clamps_within_current_month() {
        assert_eq!(seed(date(2026, 2, 10), 31).unwrap(), date(2026, 2, 28));
    }
}

//! Calendar-derived crowd context: weekday and month factors, season
//! buckets, and the holiday table.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::catalog::Category;

/// Weekday crowd factors, Monday..Sunday.
pub const WEEKDAY_FACTOR: [f64; 7] = [0.82, 0.86, 0.90, 0.95, 1.05, 1.28, 1.32];

/// Month crowd factors, January..December.
pub const MONTH_FACTOR: [f64; 12] = [
    1.18, 1.15, 1.05, 0.90, 0.80, 0.85, 0.92, 0.95, 0.96, 1.05, 1.18, 1.22,
];

/// English weekday names, Monday..Sunday. Encoder universe.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Season bucket labels. Encoder universe.
pub const SEASON_BUCKETS: [&str; 9] = [
    "monsoon0",
    "monsoon1",
    "monsoon2",
    "post-monsoon",
    "summer0",
    "summer1",
    "winter0",
    "winter1",
    "winter2",
];

/// Fixed month -> season bucket mapping.
pub fn season_bucket(month: u32) -> &'static str {
    match month {
        1 | 2 => "winter2",
        3 => "summer0",
        4 | 5 => "summer1",
        6 => "monsoon0",
        7 => "monsoon1",
        8 => "monsoon2",
        9 | 10 => "post-monsoon",
        11 => "winter0",
        _ => "winter1",
    }
}

// Exact-date holiday rules: (year, month, day), name, and the crowd
// multipliers for non-religious and religious categories.
const HOLIDAY_RULES: &[((i32, u32, u32), &str, f64, f64)] = &[
    ((2024, 8, 15), "Independence Day", 1.15, 1.15),
    ((2024, 8, 19), "Raksha Bandhan", 1.05, 1.20),
    ((2024, 8, 26), "Janmashtami", 1.05, 1.25),
    ((2024, 9, 14), "Nuakhai", 1.20, 1.35),
    ((2024, 10, 2), "Gandhi Jayanti", 1.10, 1.10),
    ((2024, 10, 31), "Diwali", 1.08, 1.20),
    ((2024, 11, 1), "Diwali", 1.10, 1.22),
    ((2024, 11, 2), "Diwali", 1.08, 1.20),
    ((2024, 12, 25), "Christmas", 1.12, 1.10),
    ((2025, 1, 26), "Republic Day", 1.12, 1.12),
    ((2025, 7, 7), "Rath Yatra", 1.20, 1.40),
    ((2025, 8, 9), "Raksha Bandhan", 1.05, 1.20),
    ((2025, 8, 15), "Independence Day", 1.15, 1.15),
];

/// Unique holiday labels plus the two fallback classifications.
/// Encoder universe.
pub fn holiday_labels() -> Vec<&'static str> {
    let mut labels = vec!["Not a holiday", "Weekend"];
    for &(_, name, _, _) in HOLIDAY_RULES {
        if !labels.contains(&name) {
            labels.push(name);
        }
    }
    labels
}

/// Holiday classification of a date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HolidayClass {
    /// A date present in the holiday table.
    Named {
        name: &'static str,
        general: f64,
        religious: f64,
    },
    /// Saturday or Sunday, absent from the holiday table.
    Weekend,
    /// An ordinary weekday.
    Ordinary,
}

impl HolidayClass {
    /// Exact-date lookup first; weekend/ordinary otherwise.
    pub fn for_date(date: NaiveDate) -> Self {
        let key = (date.year(), date.month(), date.day());
        for &(rule_date, name, general, religious) in HOLIDAY_RULES {
            if rule_date == key {
                return HolidayClass::Named {
                    name,
                    general,
                    religious,
                };
            }
        }
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => HolidayClass::Weekend,
            _ => HolidayClass::Ordinary,
        }
    }

    /// Label used for categorical encoding and display.
    pub fn label(&self) -> &'static str {
        match self {
            HolidayClass::Named { name, .. } => name,
            HolidayClass::Weekend => "Weekend",
            HolidayClass::Ordinary => "Not a holiday",
        }
    }

    /// Crowd multiplier; the religious category has its own column.
    pub fn multiplier(&self, category: Category) -> f64 {
        match self {
            HolidayClass::Named {
                general, religious, ..
            } => {
                if category.is_religious() {
                    *religious
                } else {
                    *general
                }
            }
            HolidayClass::Weekend => {
                if category.is_religious() {
                    1.2
                } else {
                    1.1
                }
            }
            HolidayClass::Ordinary => 1.0,
        }
    }
}

/// Everything the feature builder needs to know about a date.
#[derive(Debug, Clone, Copy)]
pub struct CalendarContext {
    pub weekday: Weekday,
    pub month: u32,
    pub day_of_year: u32,
    pub season: &'static str,
    pub holiday: HolidayClass,
}

impl CalendarContext {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            weekday: date.weekday(),
            month: date.month(),
            day_of_year: date.ordinal(),
            season: season_bucket(date.month()),
            holiday: HolidayClass::for_date(date),
        }
    }

    pub fn weekday_factor(&self) -> f64 {
        WEEKDAY_FACTOR[self.weekday.num_days_from_monday() as usize]
    }

    pub fn month_factor(&self) -> f64 {
        MONTH_FACTOR[(self.month - 1) as usize]
    }

    pub fn weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES[self.weekday.num_days_from_monday() as usize]
    }

    /// Smooth seasonal bias independent of the discrete season bucket.
    pub fn long_term_trend(&self) -> f64 {
        1.0 + 0.02 * (self.day_of_year as f64 / 365.0 * 2.0 * std::f64::consts::PI).sin()
    }
}

use crate::models::fleet::{DailyLoad, WeekBucket, is_weekend, weekday_name};
use crate::utils::truncate_count;
use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;
use rand::rngs::StdRng;

pub const WINDOW_DAYS: u32 = 28;
const BASE_LOAD: f64 = 100.0;
const TREND_PER_DAY: f64 = 0.5;
/// Monday..Sunday demand multipliers.
const WEEKDAY_PATTERN: [f64; 7] = [1.0, 1.1, 1.2, 1.1, 1.0, 0.7, 0.5];

/// Daily load series over the trailing window, newest day first.
pub fn synthesize(today: NaiveDate, rng: &mut StdRng) -> Vec<DailyLoad> {
    let mut loads = Vec::with_capacity(WINDOW_DAYS as usize);
    for offset in 0..WINDOW_DAYS {
        let Some(date) = today.checked_sub_days(Days::new(offset as u64)) else {
            break;
        };
        let weekday = date.weekday();

        let base = BASE_LOAD + offset as f64 * TREND_PER_DAY;
        let mut load = base * WEEKDAY_PATTERN[weekday.num_days_from_monday() as usize];
        load *= rng.random_range(0.9..1.1);
        load *= holiday_multiplier(date);

        loads.push(DailyLoad {
            date,
            loads: truncate_count(load),
            week: WeekBucket::from_offset(offset),
            day_of_week: weekday_name(weekday).to_string(),
            is_weekend: is_weekend(weekday),
        });
    }
    loads
}

fn holiday_multiplier(date: NaiveDate) -> f64 {
    match (date.month(), date.day()) {
        (12, 24) | (12, 25) | (12, 31) => 1.5,
        (7, 4) => 0.7,
        _ => 1.0,
    }
}

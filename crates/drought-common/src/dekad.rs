//! Dekad calendar handling.
//!
//! A dekad is a ~10-day period; each calendar month holds three: days 1-10,
//! 11-20, and 21 to the end of the month. A dekad is identified by its first
//! day, which is the canonical timestamp used on all aligned time axes.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single dekad, represented by its first day (1st, 11th or 21st).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dekad(NaiveDate);

impl Dekad {
    /// The dekad containing `date`.
    ///
    /// The dekad start is day 1, 11 or 21 of the date's month, whichever is
    /// the largest not exceeding the date's day.
    pub fn containing(date: NaiveDate) -> Self {
        let day = match date.day() {
            1..=10 => 1,
            11..=20 => 11,
            _ => 21,
        };
        // day 1/11/21 exists in every month
        Dekad(date.with_day(day).unwrap())
    }

    /// First day of the dekad (the canonical timestamp).
    pub fn start(&self) -> NaiveDate {
        self.0
    }

    /// Position within the month: 0, 1 or 2.
    pub fn index_in_month(&self) -> u32 {
        (self.0.day() - 1) / 10
    }

    /// The dekad immediately after this one.
    pub fn next(&self) -> Self {
        if self.0.day() < 21 {
            Dekad(self.0.with_day(self.0.day() + 10).unwrap())
        } else {
            Dekad(
                (self.0 + Months::new(1)).with_day(1).unwrap(),
            )
        }
    }

    /// The dekad immediately before this one.
    pub fn prev(&self) -> Self {
        if self.0.day() > 1 {
            Dekad(self.0.with_day(self.0.day() - 10).unwrap())
        } else {
            Dekad(
                (self.0 - Months::new(1)).with_day(21).unwrap(),
            )
        }
    }

    /// Shift backwards by `n` dekads.
    pub fn minus(&self, n: u32) -> Self {
        let mut d = *self;
        for _ in 0..n {
            d = d.prev();
        }
        d
    }

    /// All dekads whose period overlaps the inclusive date range.
    pub fn range(start: NaiveDate, end: NaiveDate) -> DekadRange {
        DekadRange {
            next: Some(Dekad::containing(start)),
            last: Dekad::containing(end),
        }
    }
}

impl std::fmt::Display for Dekad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Iterator over consecutive dekads, inclusive of both ends.
#[derive(Debug, Clone)]
pub struct DekadRange {
    next: Option<Dekad>,
    last: Dekad,
}

impl Iterator for DekadRange {
    type Item = Dekad;

    fn next(&mut self) -> Option<Dekad> {
        let current = self.next?;
        if current > self.last {
            self.next = None;
            return None;
        }
        self.next = Some(current.next());
        Some(current)
    }
}

use chrono::{Datelike, NaiveDate};

/// Date partition of a source. Only ever used to build a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<NaiveDate> for Partition {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl Partition {
    /// Path fragment under `prefix`. Components are not zero padded.
    pub fn path_under(&self, prefix: &str) -> String {
        format!(
            "{prefix}/arrival_year={}/arrival_month={}/arrival_day={}/",
            self.year, self.month, self.day
        )
    }
}

/// Resolves the object-store path to load for `date`.
///
/// In test mode the prefix is returned untouched so a load can point at
/// fixture data instead of a dated partition.
pub fn resolve(prefix: &str, date: NaiveDate, test_mode: bool) -> String {
    if test_mode {
        return prefix.to_string();
    }
    Partition::from(date).path_under(prefix)
}

/// Per-day entry counter
///
/// Counts entries opened on the current trading date. The count resets the
/// first time a bar from a different date is observed.
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCounter {
    date: Option<NaiveDate>,
    count: u32,
    cap: u32,
}

impl DailyCounter {
    pub fn new(cap: u32) -> Self {
        Self {
            date: None,
            count: 0,
            cap,
        }
    }

    /// Observe the date of the bar being processed. Call before any decision.
    pub fn observe(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.date = Some(date);
            self.count = 0;
        }
    }

    /// True while entries opened today are below the cap.
    pub fn can_enter(&self) -> bool {
        self.count < self.cap
    }

    pub fn record_entry(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

use time::macros::format_description;
use time::OffsetDateTime;

pub trait TimeSource {
    fn now(&self) -> OffsetDateTime;

    /// Return an ISO timestamp
    fn current_time(&self) -> String {
        self.now()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .expect("failed to iso8601 format timestamp")
    }

    /// UTC calendar day, `yyyy-MM-dd`. Used in daily counter document ids.
    fn current_date(&self) -> String {
        self.now()
            .format(format_description!("[year]-[month]-[day]"))
            .expect("failed to format date")
    }
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Frozen clock for tests.
#[derive(Clone)]
pub struct FixedTime {
    pub time: OffsetDateTime,
}

impl TimeSource for FixedTime {
    fn now(&self) -> OffsetDateTime {
        self.time
    }
}

use chrono::{NaiveDate, Utc};

/// The calendar day a run records donations under
///
/// The job is scheduled late in the UTC day so that the UTC date matches
/// the game's UTC+7 business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPeriod {
    date: NaiveDate,
}

impl RunPeriod {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Current UTC date
    pub fn today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    /// Parse a `YYYY-MM-DD` override
    pub fn parse(raw: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map(Self::new)
    }

    /// `YYYY-MM-DD`
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM`
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

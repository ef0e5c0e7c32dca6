//! Pipeline configuration

use clap::ValueEnum;

use crate::error::RfmError;

/// Default analysis window length in days
pub const DEFAULT_PERIOD_DAYS: u32 = 365;

/// How the week component of a `week.year` field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WeekNumbering {
    /// Week 1 starts on the first Monday of the year, week 0 is the Monday on or
    /// before January 1st
    #[default]
    Monday,
    /// ISO-8601 week of the ISO year
    Iso,
}

/// What to do with an input row that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MalformedRowPolicy {
    /// Abort the run on the first malformed row
    #[default]
    Fail,
    /// Drop the row, log it and count it
    Skip,
}

/// Settings for a single pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Length of the trailing analysis window
    pub period_days: u32,
    /// Field separator of the input table
    pub separator: u8,
    /// Decimal mark used by numeric input fields
    pub decimal_mark: char,
    pub week_numbering: WeekNumbering,
    pub on_malformed: MalformedRowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period_days: DEFAULT_PERIOD_DAYS,
            separator: b';',
            decimal_mark: ',',
            week_numbering: WeekNumbering::Monday,
            on_malformed: MalformedRowPolicy::Fail,
        }
    }
}

impl PipelineConfig {
    /// Reject settings that would make the input table ambiguous
    pub fn validate(&self) -> crate::Result<()> {
        if self.period_days == 0 {
            return Err(RfmError::InvalidConfig(
                "window period must be at least one day".to_string(),
            ));
        }
        if !self.separator.is_ascii() || self.separator.is_ascii_alphanumeric() {
            return Err(RfmError::InvalidConfig(format!(
                "unusable field separator {:?}",
                self.separator as char
            )));
        }
        if self.decimal_mark.is_ascii_alphanumeric() || self.decimal_mark == '-' {
            return Err(RfmError::InvalidConfig(format!(
                "unusable decimal mark {:?}",
                self.decimal_mark
            )));
        }
        if self.decimal_mark == self.separator as char {
            return Err(RfmError::InvalidConfig(
                "decimal mark and field separator must differ".to_string(),
            ));
        }
        Ok(())
    }
}

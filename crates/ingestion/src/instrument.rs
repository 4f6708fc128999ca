//! Instrument canonicalization across venue naming conventions.
//!
//! Venue A names option contracts `ETH-20250531-2700-C`, venue B names the same
//! contract `ETH-31MAY25-2700-C`. The ISO-date form is canonical: it is what
//! paired observations are keyed on.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use xvenue_core::{Error, Exchange, OptionInstrument, OptionRight, Result};

/// Month abbreviations used by the day-month-year grammar.
const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Which grammar an instrument string was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentFormat {
    /// `SYMBOL-YYYYMMDD-STRIKE-{C|P}` (venue A, canonical).
    IsoDate,
    /// `SYMBOL-DMONYY-STRIKE-{C|P}` (venue B).
    DayMonthYear,
}

impl InstrumentFormat {
    /// Grammar used by a venue.
    pub fn for_exchange(exchange: Exchange) -> Self {
        match exchange {
            Exchange::A => InstrumentFormat::IsoDate,
            Exchange::B => InstrumentFormat::DayMonthYear,
        }
    }
}

/// `SYMBOL-YYYYMMDD-STRIKE-{C|P}`.
const ISO_DATE_PATTERN: &str = r"^([A-Z]+)-([0-9]{8})-([0-9]+)-([CP])$";

/// `SYMBOL-D{1,2}MONYY-STRIKE-{C|P}`.
const DAY_MONTH_YEAR_PATTERN: &str = r"^([A-Z]+)-([0-9]{1,2})([A-Z]{3})([0-9]{2})-([0-9]+)-([CP])$";

/// Parses and renders option instrument identifiers in both venue grammars.
#[derive(Debug, Clone)]
pub struct InstrumentCanonicalizer {
    iso_date: Regex,
    day_month_year: Regex,
}

impl InstrumentCanonicalizer {
    /// Create a new canonicalizer.
    pub fn new() -> Result<Self> {
        Ok(Self {
            iso_date: compile_pattern(ISO_DATE_PATTERN)?,
            day_month_year: compile_pattern(DAY_MONTH_YEAR_PATTERN)?,
        })
    }

    /// Parse an instrument in either grammar.
    ///
    /// Returns `None` if the string matches neither grammar, names an unknown
    /// month, or denotes an impossible calendar date.
    pub fn parse(&self, instrument: &str) -> Option<(OptionInstrument, InstrumentFormat)> {
        if let Some(caps) = self.iso_date.captures(instrument) {
            let date = &caps[2];
            let expiry = NaiveDate::from_ymd_opt(
                date[0..4].parse().ok()?,
                date[4..6].parse().ok()?,
                date[6..8].parse().ok()?,
            )?;
            let parsed = option(&caps[1], expiry, &caps[3], &caps[4])?;
            return Some((parsed, InstrumentFormat::IsoDate));
        }

        let caps = self.day_month_year.captures(instrument)?;
        let month = MONTHS.iter().position(|m| *m == &caps[3])? as u32 + 1;
        let year = 2000 + caps[4].parse::<i32>().ok()?;
        let expiry = NaiveDate::from_ymd_opt(year, month, caps[2].parse().ok()?)?;
        let parsed = option(&caps[1], expiry, &caps[5], &caps[6])?;
        Some((parsed, InstrumentFormat::DayMonthYear))
    }

    /// Like [`parse`](Self::parse), but reports unmatched input as
    /// `Error::Parse` for callers that require an option contract.
    pub fn try_parse(&self, instrument: &str) -> Result<OptionInstrument> {
        self.parse(instrument)
            .map(|(parsed, _)| parsed)
            .ok_or_else(|| Error::parse(format!("not an option instrument: {instrument:?}")))
    }

    /// Detect the grammar of an instrument string.
    pub fn detect_format(&self, instrument: &str) -> Option<InstrumentFormat> {
        self.parse(instrument).map(|(_, format)| format)
    }

    /// Canonical (ISO-date) form of an instrument in either grammar.
    pub fn canonicalize(&self, instrument: &str) -> Option<String> {
        self.to_format_a(instrument)
    }

    /// Canonical form, or the input unchanged if it cannot be parsed.
    ///
    /// Unparseable instruments are never errors; they simply cannot pair
    /// across venues.
    pub fn canonical_or_raw(&self, instrument: &str) -> String {
        self.canonicalize(instrument)
            .unwrap_or_else(|| instrument.to_string())
    }

    /// Render an instrument in the ISO-date grammar.
    pub fn to_format_a(&self, instrument: &str) -> Option<String> {
        self.parse(instrument)
            .map(|(parsed, _)| render(&parsed, InstrumentFormat::IsoDate))
    }

    /// Render an instrument in the day-month-year grammar.
    pub fn to_format_b(&self, instrument: &str) -> Option<String> {
        self.parse(instrument)
            .map(|(parsed, _)| render(&parsed, InstrumentFormat::DayMonthYear))
    }

    /// Render an instrument the way `target` names it.
    ///
    /// Strings matching neither grammar pass through unchanged.
    pub fn convert_for_exchange(&self, instrument: &str, target: Exchange) -> String {
        match self.parse(instrument) {
            Some((parsed, _)) => render(&parsed, InstrumentFormat::for_exchange(target)),
            None => instrument.to_string(),
        }
    }
}

/// Render a parsed instrument in the given grammar.
pub fn render(instrument: &OptionInstrument, format: InstrumentFormat) -> String {
    let date = match format {
        InstrumentFormat::IsoDate => instrument.expiry.format("%Y%m%d").to_string(),
        InstrumentFormat::DayMonthYear => format!(
            "{}{}{:02}",
            instrument.expiry.day(),
            MONTHS[instrument.expiry.month0() as usize],
            instrument.expiry.year().rem_euclid(100)
        ),
    };
    format!(
        "{}-{}-{}-{}",
        instrument.underlying,
        date,
        instrument.strike,
        instrument.right.code()
    )
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::config(format!("invalid instrument pattern {pattern:?}: {e}")))
}

fn option(
    underlying: &str,
    expiry: NaiveDate,
    strike: &str,
    right: &str,
) -> Option<OptionInstrument> {
    Some(OptionInstrument {
        underlying: underlying.to_string(),
        expiry,
        strike: strike.to_string(),
        right: OptionRight::from_code(right)?,
    })
}

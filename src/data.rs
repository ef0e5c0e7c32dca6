//! Sales table ingestion using Polars
//!
//! The input table is read with every column as text so that each field can be
//! validated here with an accurate row number. Rows are normalized into
//! [`Order`]s carrying a calendar date derived from the `week.year` field.

use std::fmt;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{MalformedRowPolicy, PipelineConfig, WeekNumbering};
use crate::error::RfmError;

/// Combined week and year, e.g. `13.2023`
pub const WEEK_YEAR_COLUMN: &str = "week.year";
pub const COUNTRY_COLUMN: &str = "country";
pub const CUSTOMER_ID_COLUMN: &str = "id";
pub const UNITS_COLUMN: &str = "units";
pub const REVENUE_COLUMN: &str = "revenue";

/// Column names of the normalized orders frame; revenue becomes monetary
pub const ORDER_CUSTOMER_ID: &str = "customer_id";
pub const ORDER_COUNTRY: &str = "country";
/// Order date as a day number, see [`day_number`]
pub const ORDER_DAY: &str = "order_day";
pub const ORDER_UNITS: &str = "units";
pub const ORDER_MONETARY: &str = "monetary";

/// A single sales order. Negative units and revenue denote a return.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub customer_id: String,
    pub country: String,
    pub order_date: NaiveDate,
    pub units: i64,
    pub revenue: f64,
}

/// Customer identity within a country.
///
/// Raw ids are not unique across countries, so the same id seen in two
/// countries is two different customers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomerKey {
    pub country: String,
    pub customer_id: String,
}

impl CustomerKey {
    pub fn new(country: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            customer_id: customer_id.into(),
        }
    }
}

impl fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.country, self.customer_id)
    }
}

/// Orders read from a table, plus the number of rows dropped under
/// [`MalformedRowPolicy::Skip`]
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub orders: Vec<Order>,
    pub skipped: usize,
}

impl Ingested {
    /// Earliest and latest order date, if any orders were read
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.orders.iter().map(|o| o.order_date).min()?;
        let last = self.orders.iter().map(|o| o.order_date).max()?;
        Some((first, last))
    }
}

/// Load sales orders from a delimited text file
///
/// # Arguments
/// * `file_path` - Path to the sales table
/// * `config` - Separator, decimal mark, week numbering and malformed-row policy
///
/// # Returns
/// * `Ingested` orders in file order
pub fn load_orders(file_path: impl AsRef<Path>, config: &PipelineConfig) -> crate::Result<Ingested> {
    config.validate()?;
    let file_path = file_path.as_ref();

    if std::fs::metadata(file_path)?.len() == 0 {
        return Err(RfmError::InsufficientData(format!(
            "input file {} is empty",
            file_path.display()
        )));
    }

    let df = read_text_table(file_path, config.separator)?;
    debug!(rows = df.height(), columns = df.width(), "read sales table");

    let ingested = orders_from_frame(&df, config)?;

    match ingested.date_range() {
        Some((first, last)) => info!(
            orders = ingested.orders.len(),
            skipped = ingested.skipped,
            "Sales from {} to {}",
            first,
            last
        ),
        None => warn!(skipped = ingested.skipped, "no orders found in input"),
    }

    Ok(ingested)
}

/// Days since 0001-01-01 (CE), used for date arithmetic inside frames
pub fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

/// Lay orders out as a frame for windowing and aggregation
pub fn orders_frame(orders: &[Order]) -> crate::Result<DataFrame> {
    let df = df!(
        ORDER_CUSTOMER_ID => orders.iter().map(|o| o.customer_id.as_str()).collect::<Vec<_>>(),
        ORDER_COUNTRY => orders.iter().map(|o| o.country.as_str()).collect::<Vec<_>>(),
        ORDER_DAY => orders.iter().map(|o| day_number(o.order_date)).collect::<Vec<i64>>(),
        ORDER_UNITS => orders.iter().map(|o| o.units).collect::<Vec<i64>>(),
        ORDER_MONETARY => orders.iter().map(|o| o.revenue).collect::<Vec<f64>>()
    )?;
    Ok(df)
}

/// Read a delimited file with a header row, every column as text
pub(crate) fn read_text_table(file_path: &Path, separator: u8) -> crate::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(separator))
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Borrow a text column as optional values, one per row
pub(crate) fn text_column<'a>(df: &'a DataFrame, name: &str) -> crate::Result<Vec<Option<&'a str>>> {
    let series = df
        .column(name)
        .map_err(|_| RfmError::MissingColumn(name.to_string()))?;
    Ok(series.str()?.into_iter().collect())
}

/// Convert a text frame into orders, applying the malformed-row policy
fn orders_from_frame(df: &DataFrame, config: &PipelineConfig) -> crate::Result<Ingested> {
    let week_years = text_column(df, WEEK_YEAR_COLUMN)?;
    let countries = text_column(df, COUNTRY_COLUMN)?;
    let ids = text_column(df, CUSTOMER_ID_COLUMN)?;
    let units = text_column(df, UNITS_COLUMN)?;
    let revenues = text_column(df, REVENUE_COLUMN)?;

    let mut ingested = Ingested {
        orders: Vec::with_capacity(df.height()),
        skipped: 0,
    };

    for i in 0..df.height() {
        let fields = RawOrder {
            week_year: week_years[i],
            country: countries[i],
            customer_id: ids[i],
            units: units[i],
            revenue: revenues[i],
        };

        match parse_order(i + 1, &fields, config) {
            Ok(order) => ingested.orders.push(order),
            Err(err) if config.on_malformed == MalformedRowPolicy::Skip => {
                warn!("skipping {}", err);
                ingested.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(ingested)
}

/// Text fields of one input row
struct RawOrder<'a> {
    week_year: Option<&'a str>,
    country: Option<&'a str>,
    customer_id: Option<&'a str>,
    units: Option<&'a str>,
    revenue: Option<&'a str>,
}

fn parse_order(row: usize, fields: &RawOrder<'_>, config: &PipelineConfig) -> crate::Result<Order> {
    let malformed = |column: &str, value: Option<&str>, reason: &str| RfmError::MalformedRow {
        row,
        column: column.to_string(),
        value: value.unwrap_or_default().to_string(),
        reason: reason.to_string(),
    };

    let customer_id = non_empty(fields.customer_id)
        .ok_or_else(|| malformed(CUSTOMER_ID_COLUMN, fields.customer_id, "missing customer id"))?;
    let country = non_empty(fields.country)
        .ok_or_else(|| malformed(COUNTRY_COLUMN, fields.country, "missing country"))?;

    let week_year = fields
        .week_year
        .ok_or_else(|| malformed(WEEK_YEAR_COLUMN, None, "missing week.year"))?;
    let order_date = parse_week_year(week_year, config.week_numbering)
        .map_err(|reason| malformed(WEEK_YEAR_COLUMN, Some(week_year), &reason))?;

    let units = fields
        .units
        .map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| malformed(UNITS_COLUMN, fields.units, "not an integer"))?;

    let revenue = fields
        .revenue
        .and_then(|s| parse_decimal(s, config.decimal_mark))
        .ok_or_else(|| malformed(REVENUE_COLUMN, fields.revenue, "not a decimal number"))?;

    Ok(Order {
        customer_id: customer_id.to_string(),
        country: country.to_string(),
        order_date,
        units,
        revenue,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Derive the Monday that starts the week encoded as `week.year`
///
/// Returns a description of the problem when the field cannot be parsed.
pub fn parse_week_year(raw: &str, numbering: WeekNumbering) -> Result<NaiveDate, String> {
    let (week, year) = raw
        .trim()
        .split_once('.')
        .ok_or_else(|| "expected <week>.<year>".to_string())?;

    let week: u32 = week
        .trim()
        .parse()
        .map_err(|_| format!("week '{}' is not a number", week))?;
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| format!("year '{}' is not a number", year))?;

    week_start(year, week, numbering)
        .ok_or_else(|| format!("week {} does not exist in year {}", week, year))
}

/// Monday of `week` in `year` under the given numbering
pub fn week_start(year: i32, week: u32, numbering: WeekNumbering) -> Option<NaiveDate> {
    match numbering {
        WeekNumbering::Iso => NaiveDate::from_isoywd_opt(year, week, Weekday::Mon),
        WeekNumbering::Monday => {
            if week > 53 {
                return None;
            }
            let jan_first = NaiveDate::from_ymd_opt(year, 1, 1)?;
            if week == 0 {
                // the Monday on or before January 1st, which is week 1 itself
                // when the year starts on a Monday
                let back = jan_first.weekday().num_days_from_monday();
                return Some(jan_first - Duration::days(i64::from(back)));
            }
            let offset = (7 - jan_first.weekday().num_days_from_monday()) % 7;
            let first_monday = jan_first + Duration::days(i64::from(offset));
            first_monday.checked_add_signed(Duration::weeks(i64::from(week) - 1))
        }
    }
}

/// Parse a decimal number written with `decimal_mark`
///
/// Grouping separators are not accepted; non-finite values are rejected.
pub fn parse_decimal(raw: &str, decimal_mark: char) -> Option<f64> {
    let trimmed = raw.trim();
    let normalized = if decimal_mark == '.' {
        trimmed.to_string()
    } else if trimmed.contains('.') {
        return None;
    } else {
        trimmed.replace(decimal_mark, ".")
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

//! Flat CSV export of scored customers, and validation of a re-read export

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::data::{parse_decimal, read_text_table, text_column, CustomerKey};
use crate::error::RfmError;
use crate::rfm::RfmRecord;
use crate::score::{Score, ScoreSet, ScoredCustomer};
use crate::segment::Segment;

/// Export columns, in file order
pub const EXPORT_COLUMNS: [&str; 11] = [
    "customer_id",
    "country",
    "recency",
    "frequency",
    "monetary",
    "r",
    "f",
    "m",
    "rfm_score",
    "fm",
    "segment",
];

/// Build the export table
pub fn export_frame(customers: &[ScoredCustomer]) -> crate::Result<DataFrame> {
    let score_column = |pick: fn(&ScoreSet) -> Score| -> Vec<i32> {
        customers
            .iter()
            .map(|c| i32::from(pick(&c.scores).value()))
            .collect()
    };

    let df = df!(
        "customer_id" => customers.iter().map(|c| c.record.key.customer_id.as_str()).collect::<Vec<_>>(),
        "country" => customers.iter().map(|c| c.record.key.country.as_str()).collect::<Vec<_>>(),
        "recency" => customers.iter().map(|c| c.record.recency).collect::<Vec<i64>>(),
        "frequency" => customers.iter().map(|c| c.record.frequency as i64).collect::<Vec<i64>>(),
        "monetary" => customers.iter().map(|c| c.record.monetary).collect::<Vec<f64>>(),
        "r" => score_column(|s| s.r),
        "f" => score_column(|s| s.f),
        "m" => score_column(|s| s.m),
        "rfm_score" => customers.iter().map(|c| c.scores.rfm_score()).collect::<Vec<String>>(),
        "fm" => score_column(|s| s.fm),
        "segment" => customers.iter().map(|c| c.scores.segment.label()).collect::<Vec<_>>()
    )?;
    Ok(df)
}

/// Write scored customers as comma-separated values, monetary with 2 decimals
pub fn write_export(customers: &[ScoredCustomer], output_path: impl AsRef<Path>) -> crate::Result<()> {
    let output_path = output_path.as_ref();
    let mut df = export_frame(customers)?;
    let mut file = File::create(output_path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_float_precision(Some(2))
        .finish(&mut df)?;

    info!(
        customers = customers.len(),
        path = %output_path.display(),
        "wrote RFM export"
    );
    Ok(())
}

/// Read an export back and check every row is self-consistent
///
/// Scores must be in range, `rfm_score` and `fm` must agree with r, f and m,
/// and `segment` must be the label the classifier assigns to `(r, fm)`.
pub fn read_export(input_path: impl AsRef<Path>) -> crate::Result<Vec<ScoredCustomer>> {
    let df = read_text_table(input_path.as_ref(), b',')?;

    let columns = EXPORT_COLUMNS
        .iter()
        .map(|name| text_column(&df, name))
        .collect::<crate::Result<Vec<_>>>()?;

    let mut customers = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row: Vec<&str> = columns.iter().map(|c| c[i].unwrap_or_default()).collect();
        customers.push(parse_export_row(i + 1, &row)?);
    }

    Ok(customers)
}

/// Text fields of one export row, in `EXPORT_COLUMNS` order
struct ExportRow<'a> {
    row: usize,
    fields: &'a [&'a str],
}

impl<'a> ExportRow<'a> {
    fn inconsistent(&self, reason: String) -> RfmError {
        RfmError::InconsistentExport {
            row: self.row,
            reason,
        }
    }

    fn field(&self, name: &str) -> &'a str {
        EXPORT_COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|index| self.fields[index].trim())
            .unwrap_or_default()
    }

    fn integer(&self, name: &str) -> crate::Result<i64> {
        let value = self.field(name);
        value
            .parse::<i64>()
            .map_err(|_| self.inconsistent(format!("{} '{}' is not an integer", name, value)))
    }

    fn score(&self, name: &str) -> crate::Result<Score> {
        u8::try_from(self.integer(name)?)
            .ok()
            .and_then(Score::new)
            .ok_or_else(|| {
                self.inconsistent(format!("{} '{}' is not a 1-5 score", name, self.field(name)))
            })
    }
}

fn parse_export_row(row: usize, fields: &[&str]) -> crate::Result<ScoredCustomer> {
    let row = ExportRow { row, fields };

    let recency = row.integer("recency")?;
    let frequency = u64::try_from(row.integer("frequency")?)
        .map_err(|_| row.inconsistent("frequency is negative".to_string()))?;
    let monetary = parse_decimal(row.field("monetary"), '.').ok_or_else(|| {
        row.inconsistent(format!("monetary '{}' is not a number", row.field("monetary")))
    })?;

    let scores = ScoreSet::new(row.score("r")?, row.score("f")?, row.score("m")?);

    if row.field("rfm_score") != scores.rfm_score() {
        return Err(row.inconsistent(format!(
            "rfm_score {} does not match r, f, m {}",
            row.field("rfm_score"),
            scores.rfm_score()
        )));
    }
    if row.score("fm")? != scores.fm {
        return Err(row.inconsistent(format!(
            "fm {} should be {}",
            row.field("fm"),
            scores.fm
        )));
    }
    let segment: Segment = row
        .field("segment")
        .parse()
        .map_err(|reason| row.inconsistent(reason))?;
    if segment != scores.segment {
        return Err(row.inconsistent(format!(
            "segment '{}' should be '{}'",
            segment, scores.segment
        )));
    }

    Ok(ScoredCustomer {
        record: RfmRecord {
            key: CustomerKey::new(row.field("country"), row.field("customer_id")),
            recency,
            frequency,
            monetary,
        },
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn customer(id: &str, monetary: f64, r: u8, f: u8, m: u8) -> ScoredCustomer {
        ScoredCustomer {
            record: RfmRecord {
                key: CustomerKey::new("KR", id),
                recency: 8,
                frequency: 3,
                monetary,
            },
            scores: ScoreSet::new(
                Score::new(r).unwrap(),
                Score::new(f).unwrap(),
                Score::new(m).unwrap(),
            ),
        }
    }

    #[test]
    fn test_export_frame_layout() {
        let df = export_frame(&[customer("1", 10.0, 5, 5, 5)]).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, EXPORT_COLUMNS.to_vec());
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_monetary_two_decimals() {
        let file = NamedTempFile::new().unwrap();
        write_export(&[customer("1", 1234.5, 4, 2, 3)], file.path()).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), EXPORT_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "1,KR,8,3,1234.50,4,2,3,423,2,potential loyalists"
        );
    }

    #[test]
    fn test_round_trip() {
        let customers = vec![
            customer("1", 5000.0, 5, 5, 5),
            customer("2", -12.25, 1, 1, 1),
            customer("3", 80.0, 1, 5, 5),
            customer("4", 10.0, 2, 2, 2),
        ];
        let file = NamedTempFile::new().unwrap();
        write_export(&customers, file.path()).unwrap();

        let reread = read_export(file.path()).unwrap();
        assert_eq!(reread, customers);
    }

    #[test]
    fn test_rejects_wrong_segment() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", EXPORT_COLUMNS.join(",")).unwrap();
        writeln!(file, "1,KR,8,3,10.00,5,5,5,555,5,lost").unwrap();

        let err = read_export(file.path()).unwrap_err();
        assert!(matches!(err, RfmError::InconsistentExport { row: 1, .. }));
    }

    #[test]
    fn test_rejects_bad_rfm_score() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", EXPORT_COLUMNS.join(",")).unwrap();
        writeln!(file, "1,KR,8,3,10.00,5,5,5,554,5,champions").unwrap();

        assert!(read_export(file.path()).is_err());
    }
}

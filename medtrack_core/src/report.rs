//! CSV export of the projected inventory table.

use crate::dates::DISPLAY_FORMAT;
use crate::{Projection, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column names, in `CsvRow` field order
const HEADERS: [&str; 13] = [
    "medicine",
    "brand",
    "schedule",
    "intended_days",
    "remaining_days",
    "left",
    "to_buy",
    "price_per_dose",
    "price_per_day",
    "restock_cost",
    "last_updated",
    "low_stock",
    "notes",
];

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    medicine: &'a str,
    brand: Option<&'a str>,
    schedule: String,
    intended_days: u32,
    remaining_days: u32,
    left: u32,
    to_buy: u32,
    price_per_dose: Option<f64>,
    price_per_day: f64,
    restock_cost: f64,
    last_updated: Option<String>,
    low_stock: bool,
    notes: Option<&'a str>,
}

impl<'a> From<&'a Projection> for CsvRow<'a> {
    fn from(p: &'a Projection) -> Self {
        CsvRow {
            medicine: &p.generic_name,
            brand: p.brand_name.as_deref(),
            schedule: p.schedule.label(),
            intended_days: p.adjusted_intended_days,
            remaining_days: p.days_remaining,
            left: p.adjusted_doses_left,
            to_buy: p.doses_to_buy,
            price_per_dose: p.price_per_dose,
            price_per_day: p.price_per_day,
            restock_cost: p.restock_cost(),
            last_updated: p
                .last_updated
                .map(|d| d.format(DISPLAY_FORMAT).to_string()),
            low_stock: p.low_stock,
            notes: p.notes.as_deref(),
        }
    }
}

/// Write projections as CSV to any writer
///
/// The header row is always written, even when there are no projections.
pub fn write_csv<W: Write>(projections: &[Projection], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(HEADERS)?;
    for projection in projections {
        csv_writer.serialize(CsvRow::from(projection))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Export projections to a CSV file, replacing any existing file
///
/// The file is synced to disk before returning.
pub fn export_csv(projections: &[Projection], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    write_csv(projections, &mut file)?;
    file.sync_all()?;

    tracing::info!("Exported {} medicines to {:?}", projections.len(), path);
    Ok(projections.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project;
    use crate::{MedicineId, MedicineRecord, Schedule};
    use chrono::NaiveDate;

    fn projection(name: &str, price: Option<f64>) -> Projection {
        let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let record = MedicineRecord {
            id: MedicineId::new(),
            generic_name: name.into(),
            brand_name: Some("Generic Co".into()),
            schedule: Schedule::new(true, true, false),
            intended_duration_days: 7,
            doses_left: 4,
            price_per_dose: price,
            notes: Some("with food".into()),
            last_updated: Some(today),
        };
        project(&record, today)
    }

    #[test]
    fn test_write_csv_headers_and_rows() {
        let projections = vec![projection("Cefalexin", Some(10.0)), projection("Zinc", None)];
        let mut buf = Vec::new();
        write_csv(&projections, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "medicine,brand,schedule,intended_days,remaining_days,left,to_buy,\
             price_per_dose,price_per_day,restock_cost,last_updated,low_stock,notes"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Cefalexin,Generic Co,8AM 1PM,7,2,4,10,10.0,20.0,100.0,10-02-2024,true,with food"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Zinc,Generic Co,8AM 1PM,7,2,4,10,,0.0,0.0,10-02-2024,true,with food"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_export_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("exports/inventory.csv");

        let count = export_csv(&[projection("Cefalexin", Some(1.0))], &path).unwrap();
        assert_eq!(count, 1);

        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), 1);
    }

    #[test]
    fn test_export_empty_inventory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("inventory.csv");

        let count = export_csv(&[], &path).unwrap();
        assert_eq!(count, 0);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![HEADERS.join(",")]);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), HEADERS.len());
        assert_eq!(reader.records().count(), 0);
    }
}

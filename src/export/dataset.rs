//! Dataset export for offline inspection

use crate::error::{NetsenseError, Result};
use crate::traffic::Dataset;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Default dataset export location
pub const DEFAULT_DATASET_PATH: &str = "data/network_traffic.csv";

#[derive(Serialize)]
struct CsvRow<'a> {
    packet_size: f64,
    time_interval: f64,
    protocol: u8,
    dest_port: u16,
    label: Option<u8>,
    timestamp: &'a str,
}

/// Write a dataset as a record-oriented CSV file
///
/// Columns: `packet_size, time_interval, protocol, dest_port, label,
/// timestamp`, one row per record, in display order.
pub fn write_csv(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NetsenseError::DataError(e.to_string()))?;
        }
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| NetsenseError::DataError(e.to_string()))?;

    for record in dataset.records() {
        let timestamp = record.timestamp.to_rfc3339();
        let row = CsvRow {
            packet_size: record.packet_size,
            time_interval: record.time_interval,
            protocol: record.protocol.code(),
            dest_port: record.dest_port,
            label: record.label.map(|l| l.as_u8()),
            timestamp: &timestamp,
        };
        writer
            .serialize(row)
            .map_err(|e| NetsenseError::DataError(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| NetsenseError::DataError(e.to_string()))?;

    info!(path = %path.display(), rows = dataset.len(), "exported dataset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::TrafficGenerator;

    #[test]
    fn test_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.csv");

        let mut gen = TrafficGenerator::new().with_seed(42);
        let dataset = gen.generate(25, 0.2).unwrap();
        write_csv(&dataset, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "packet_size,time_interval,protocol,dest_port,label,timestamp"
        );
        assert_eq!(lines.count(), 25);
    }

    #[test]
    fn test_csv_row_order_matches_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.csv");

        let mut gen = TrafficGenerator::new().with_seed(7);
        let dataset = gen.generate(10, 0.5).unwrap();
        write_csv(&dataset, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        for (line, record) in contents.lines().skip(1).zip(dataset.records()) {
            let port_field = line.split(',').nth(3).unwrap();
            assert_eq!(port_field, record.dest_port.to_string());
        }
    }
}

//! Plain-text numeric tables: the layout numpy's `savetxt` produces
//! (`%.18e` fields, one row per line) and plain CSV records.

use crate::error::{Result, VisionError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Format a value as `%.18e` (two-digit signed exponent). Non-finite values
/// are written `nan`, `inf` and `-inf`.
pub fn format_e18(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{:.18e}", value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(rest) => ('-', rest),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw,
    }
}

/// Write rows of numbers, fields joined by `delimiter`.
pub fn write_rows<P, R>(path: P, rows: &[R], delimiter: &str) -> Result<()>
where
    P: AsRef<Path>,
    R: AsRef<[f32]>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| VisionError::file(path, e))?;
    let mut out = BufWriter::new(file);
    for row in rows {
        let line = row
            .as_ref()
            .iter()
            .map(|&v| format_e18(v as f64))
            .collect::<Vec<_>>()
            .join(delimiter);
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(())
}

/// Write one value per line.
pub fn write_column<P: AsRef<Path>>(path: P, values: &[f32]) -> Result<()> {
    let rows: Vec<[f32; 1]> = values.iter().map(|&v| [v]).collect();
    write_rows(path, &rows, ",")
}

/// Write rows as CSV records using the shortest round-trip formatting.
/// The parent directory is created when missing.
pub fn write_csv<P, R>(path: P, rows: &[R]) -> Result<()>
where
    P: AsRef<Path>,
    R: AsRef<[f32]>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| VisionError::file(parent, e))?;
    }
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for row in rows {
        writer.write_record(row.as_ref().iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_matches_numpy() {
        assert_eq!(format_e18(1.0), "1.000000000000000000e+00");
        assert_eq!(format_e18(0.00125), "1.250000000000000000e-03");
        assert_eq!(format_e18(-7.0), "-7.000000000000000000e+00");
        assert_eq!(format_e18(0.0), "0.000000000000000000e+00");
    }

    #[test]
    fn test_non_finite_values() {
        assert_eq!(format_e18(f64::NAN), "nan");
        assert_eq!(format_e18(f64::INFINITY), "inf");
        assert_eq!(format_e18(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_e18(f32::NAN as f64), "nan");
    }

    #[test]
    fn test_write_rows_space_delimited() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seq.txt");
        write_rows(&path, &[vec![1.0f32, 2.0], vec![3.0, 4.0]], " ").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "1.000000000000000000e+00 2.000000000000000000e+00"
        );
    }

    #[test]
    fn test_write_csv_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("encoded.csv");
        write_csv(&path, &[vec![0.5f32, 0.0, 2.25], vec![1.0, -3.0, 0.125]]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0.5,0,2.25\n1,-3,0.125\n");
    }

    #[test]
    fn test_write_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        write_column(&path, &[7.0, 2.0]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "7.000000000000000000e+00\n2.000000000000000000e+00\n");
    }
}

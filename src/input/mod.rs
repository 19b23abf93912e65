pub mod csv;

pub use self::csv::load_csv;

use anyhow::Result;
use crate::core::SampleTable;
use std::path::Path;

/// Input format detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Unknown,
}

/// Detect the format of an input file from its leading bytes
pub fn detect_format(data: &[u8]) -> InputFormat {
    if is_csv(data) {
        return InputFormat::Csv;
    }

    InputFormat::Unknown
}

fn is_csv(data: &[u8]) -> bool {
    // A header line plus at least one data line, separated by commas
    let sample = match std::str::from_utf8(&data[..data.len().min(512)]) {
        Ok(text) => text,
        // the cut may have split a multi-byte character
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&data[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    let mut lines = sample.lines().filter(|line| !line.trim().is_empty());
    match lines.next() {
        Some(header) => header.contains(',') || lines.next().is_some(),
        None => false,
    }
}

/// Load a recording, auto-detecting the format
pub fn load_file(path: &Path, sample_rate: u32) -> Result<SampleTable> {
    let data = std::fs::read(path)?;

    match detect_format(&data) {
        InputFormat::Csv => load_csv(path, sample_rate),
        InputFormat::Unknown => anyhow::bail!("Unknown input format: {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Dataset;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"Cz,Pz\n1,2\n"), InputFormat::Csv);
        assert_eq!(detect_format(b"Cz\n1\n2\n"), InputFormat::Csv);
        assert_eq!(detect_format(&[0xff, 0xfe, 0x00, 0x01]), InputFormat::Unknown);
        assert_eq!(detect_format(b""), InputFormat::Unknown);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "time,Fz,Cz").unwrap();
        for i in 0..10 {
            writeln!(file, "{},{},{}", i as f64 / 128.0, i, -i).unwrap();
        }
        file.flush().unwrap();

        let table = load_file(file.path(), 128).unwrap();
        assert_eq!(table.len(), 10);
        assert_eq!(table.channel_names(), &["Fz", "Cz"]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/recording.csv"), 128).is_err());
    }
}

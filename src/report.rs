use crate::error::{AnalyticsError, Result};
use crate::models::{Percentile, ResultRow};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Appends result rows as `recipient|zip|year|percentile|total|count` lines.
pub struct ResultWriter<W: Write> {
    writer: Writer<W>,
    rows_written: usize,
}

impl ResultWriter<File> {
    /// Truncates or creates the output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> ResultWriter<W> {
    /// Wrap any writer; used directly by tests.
    pub fn from_writer(inner: W) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        Self {
            writer,
            rows_written: 0,
        }
    }

    /// Serialize one row as a single `|`-joined line.
    pub fn write_row(&mut self, row: ResultRow) -> Result<()> {
        self.writer.serialize(row)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| AnalyticsError::Io(e.into_error()))
    }
}

/// Reads the single integer on the first line of the percentile file.
pub fn read_percentile(path: impl AsRef<Path>) -> Result<Percentile> {
    let content = fs::read_to_string(path)?;
    parse_percentile(&content)
}

/// The first line, trimmed, as an integer in 0..=100.
pub fn parse_percentile(content: &str) -> Result<Percentile> {
    let line = content
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or(AnalyticsError::MissingPercentile)?;
    let value = line
        .parse::<i64>()
        .map_err(|_| AnalyticsError::InvalidPercentile(line.to_string()))?;
    Percentile::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(recipient: &str, percentile: u64, total: u64, count: usize) -> ResultRow {
        ResultRow {
            recipient_id: recipient.to_string(),
            zip5: "30004".to_string(),
            election_year: "2018".to_string(),
            percentile_amount: percentile,
            running_total: total,
            running_count: count,
        }
    }

    #[test]
    fn rows_are_pipe_delimited_lines() {
        let mut writer = ResultWriter::from_writer(Vec::new());
        writer.write_row(row("C00384516", 333, 333, 1)).unwrap();
        writer.write_row(row("C00384516", 333, 717, 2)).unwrap();
        assert_eq!(writer.rows_written(), 2);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(output, "C00384516|30004|2018|333|333|1\nC00384516|30004|2018|333|717|2\n");
    }

    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn flush_failure_keeps_the_io_error() {
        let mut writer = ResultWriter::from_writer(ClosedSink);
        writer.write_row(row("C1", 5, 5, 1)).unwrap();

        match writer.finish() {
            Err(AnalyticsError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe);
                assert_eq!(e.to_string(), "sink closed");
            }
            other => panic!("expected an I/O error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn create_truncates_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repeat_donors.txt");
        fs::write(&path, "stale line\n").unwrap();

        let mut writer = ResultWriter::create(&path).unwrap();
        writer.write_row(row("C1", 5, 5, 1)).unwrap();
        writer.finish().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "C1|30004|2018|5|5|1\n");
    }

    #[test]
    fn percentile_is_read_from_the_first_line() {
        assert_eq!(parse_percentile("30\n").unwrap().value(), 30);
        assert_eq!(parse_percentile(" 100 \r\nignored\n").unwrap().value(), 100);
    }

    #[test]
    fn bad_percentile_sources_are_errors() {
        assert!(matches!(parse_percentile(""), Err(AnalyticsError::MissingPercentile)));
        assert!(matches!(parse_percentile("thirty"), Err(AnalyticsError::InvalidPercentile(_))));
        assert!(matches!(parse_percentile("101"), Err(AnalyticsError::PercentileOutOfRange(101))));
    }
}

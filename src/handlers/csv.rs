//! Comma-separated rendering of header cards
//!
//! Output objects live at `<source-bucket>/<source-key>/data.csv` in the
//! destination bucket; catalog crawlers derive partitions from that path.

/// Fixed first line of every output object
pub const HEADER_LINE: &str =
    "hdu, source_bucket, source_key, card_name, card_value, card_comment, other";

pub const OUTPUT_FILE_NAME: &str = "data.csv";

#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Destination key for the CSV derived from `bucket`/`key`
pub fn output_key(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}/{OUTPUT_FILE_NAME}")
}

/// One header card plus its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow<'a> {
    pub hdu: usize,
    pub source_bucket: &'a str,
    pub source_key: &'a str,
    pub card_name: &'a str,
    pub card_value: String,
    pub card_comment: &'a str,
}

impl OutputRow<'_> {
    /// Append the row; the trailing `other` column is left empty.
    pub fn render_into(&self, out: &mut String) {
        out.push_str(&self.hdu.to_string());
        for field in [self.source_bucket, self.source_key, self.card_name, self.card_value.as_str()] {
            out.push(',');
            push_field(out, field);
        }
        out.push(',');
        push_quoted(out, self.card_comment);
        out.push(',');
        out.push_str(LINE_SEPARATOR);
    }
}

/// Full payload of one output object, built in memory and written once
#[derive(Debug, Clone)]
pub struct CsvDocument {
    buf: String,
    rows: usize,
}

impl CsvDocument {
    pub fn new() -> Self {
        let mut buf = String::with_capacity(4096);
        buf.push_str(HEADER_LINE);
        buf.push_str(LINE_SEPARATOR);
        Self { buf, rows: 0 }
    }

    pub fn push(&mut self, row: &OutputRow<'_>) {
        row.render_into(&mut self.buf);
        self.rows += 1;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for CsvDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain unless the text would break the row, then RFC 4180 quoting
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        push_quoted(out, field);
    } else {
        out.push_str(field);
    }
}

fn push_quoted(out: &mut String, field: &str) {
    out.push('"');
    out.push_str(&field.replace('"', "\"\""));
    out.push('"');
}

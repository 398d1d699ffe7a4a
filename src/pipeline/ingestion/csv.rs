//! RFC 4180 reading and minimally-quoted writing.

use std::path::Path;

use crate::error::{PipelineError, Result};

/// Parses CSV text into records.
///
/// Handles quoted fields, doubled quotes, embedded newlines, CRLF endings and a
/// leading byte-order mark. Whitespace after a closing quote is ignored. Blank lines
/// are skipped. `path` only labels errors.
pub fn parse_records(content: &str, path: &Path) -> Result<Vec<Vec<String>>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // a quoted field ended; only a delimiter or line end may follow
    let mut after_quote = false;
    let mut line = 1;
    let mut quote_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            ',' => {
                record.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                finish_record(&mut records, &mut record, &mut field);
                after_quote = false;
                line += 1;
            }
            '"' if field.is_empty() && !after_quote => {
                in_quotes = true;
                quote_line = line;
            }
            ' ' | '\t' if after_quote => {}
            _ if after_quote => {
                return Err(PipelineError::Csv {
                    path: path.display().to_string(),
                    line,
                    message: format!("unexpected character '{}' after closing quote", c),
                });
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(PipelineError::Csv {
            path: path.display().to_string(),
            line: quote_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    finish_record(&mut records, &mut record, &mut field);
    Ok(records)
}

fn finish_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    if record.is_empty() && field.is_empty() {
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}

/// Quotes a field only when it contains a delimiter, a quote or a line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Accumulates CSV text with `\n` line endings.
#[derive(Debug, Default)]
pub struct CsvWriter {
    buffer: String,
    rows: usize,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_record<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = fields
            .into_iter()
            .map(|f| escape_field(f.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.buffer.push_str(&line);
        self.buffer.push('\n');
        self.rows += 1;
    }

    /// Records written so far, header included.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<Vec<String>> {
        parse_records(content, Path::new("test.csv")).unwrap()
    }

    #[test]
    fn test_plain_records() {
        let records = parse("a,b,c\n1,2,3\n");
        assert_eq!(records, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_quoted_fields() {
        let records = parse("name,height\r\n\"Slasher, Two-Way\",\"6'3\"\"\"\r\n");
        assert_eq!(records[1], vec!["Slasher, Two-Way", "6'3\""]);
    }

    #[test]
    fn test_embedded_newline() {
        let records = parse("a,b\n\"line one\nline two\",x\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], "line one\nline two");
    }

    #[test]
    fn test_empty_fields_and_blank_lines() {
        let records = parse("\u{feff}a,b,c\n\n1,,\n");
        assert_eq!(records, vec![vec!["a", "b", "c"], vec!["1", "", ""]]);
    }

    #[test]
    fn test_missing_trailing_newline() {
        let records = parse("a,b\n1,2");
        assert_eq!(records[1], vec!["1", "2"]);
    }

    #[test]
    fn test_unterminated_quote_reports_line() {
        let err = parse_records("a,b\n1,\"open\n", Path::new("bad.csv")).unwrap_err();
        match err {
            PipelineError::Csv { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_whitespace_after_closing_quote_is_skipped() {
        let records = parse_records("\"a\" ,b\n\"c\"\t,\"d\"  \n", Path::new("t.csv")).unwrap();
        assert_eq!(records, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_text_after_closing_quote_is_rejected() {
        assert!(parse_records("\"a\"b,c\n", Path::new("bad.csv")).is_err());
    }

    #[test]
    fn test_writer_quotes_minimally() {
        let mut writer = CsvWriter::new();
        writer.write_record(["name", "note"]);
        writer.write_record(["Big \"Man\"", "a,b"]);
        writer.write_record(["plain", ""]);
        assert_eq!(writer.rows(), 3);
        let text = writer.finish();
        assert_eq!(text, "name,note\n\"Big \"\"Man\"\"\",\"a,b\"\nplain,\n");
        assert_eq!(parse(&text)[1], vec!["Big \"Man\"", "a,b"]);
    }
}

//! Pasted and markdown tables into header + rows.

use once_cell::sync::Lazy;
use regex::Regex;

// "12 | " prefix left behind by numbered copy/paste
static LINE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*\|\s*").expect("line number regex is valid"));
static WIDE_GAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}|\t+").expect("gap regex is valid"));
static PIPE_RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|?[\s:\-|]+\|?$").expect("pipe rule regex is valid"));

/// A converted table; `rows` excludes the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Splits one line into cells: tabs when present, otherwise runs of two or more spaces.
/// Pipe-delimited markdown rows (`| a | b |`) split on the pipes.
pub fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.starts_with('|') {
        return line
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect();
    }
    if line.contains('\t') {
        return line.split('\t').map(|c| c.trim().to_string()).collect();
    }
    WIDE_GAP_RE.split(line).map(|c| c.trim().to_string()).collect()
}

fn strip_line_number(line: &str) -> &str {
    match LINE_NUMBER_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-') && PIPE_RULE_RE.is_match(line)
}

/// Converts table text. The first non-blank line is the header; blank lines and a
/// markdown separator row (`|---|---|`) directly under the header are dropped.
/// Returns `None` for blank input.
pub fn convert(text: &str) -> Option<ConvertedTable> {
    let mut lines = text
        .lines()
        .map(strip_line_number)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .peekable();

    let headers = split_cells(lines.next()?);
    lines.next_if(|l| is_separator_row(l));
    let rows = lines.map(split_cells).collect();
    Some(ConvertedTable { headers, rows })
}

/// Number of data rows the source text holds, counted independently of [`convert`].
pub fn count_source_rows(text: &str) -> usize {
    let lines: Vec<&str> = text
        .lines()
        .map(strip_line_number)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let separator = lines.get(1).is_some_and(|l| is_separator_row(l.trim()));
    lines.len().saturating_sub(1 + usize::from(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_tab_table() {
        let text = "1 | Build Name\tPosition\tHeight\n2 | Slasher\tPG\t6'3\"\n\n3 | Post Scorer\tC\t7'1\"\n";
        let table = convert(text).unwrap();
        assert_eq!(table.headers, vec!["Build Name", "Position", "Height"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["Post Scorer", "C", "7'1\""]);
        assert_eq!(count_source_rows(text), 2);
    }

    #[test]
    fn test_space_aligned_table() {
        let table = convert("Build Name   Speed\nPure Sniper  85 - 92\n").unwrap();
        assert_eq!(table.headers, vec!["Build Name", "Speed"]);
        assert_eq!(table.rows[0], vec!["Pure Sniper", "85 - 92"]);
    }

    #[test]
    fn test_pipe_table() {
        let text = "| Build Name | Speed |\n|---|:---:|\n| Lockdown | 70 |\n";
        let table = convert(text).unwrap();
        assert_eq!(table.headers, vec!["Build Name", "Speed"]);
        assert_eq!(table.rows, vec![vec!["Lockdown", "70"]]);
        assert_eq!(count_source_rows(text), 1);
    }

    #[test]
    fn test_placeholder_rows_are_kept() {
        let text = "| Build Name | Speed |\n|---|---|\n| - | - |\n| Lockdown | 70 |\n";
        let table = convert(text).unwrap();
        assert_eq!(table.rows, vec![vec!["-", "-"], vec!["Lockdown", "70"]]);
        assert_eq!(count_source_rows(text), 2);
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(convert("\n  \n"), None);
        assert_eq!(count_source_rows(""), 0);
    }
}

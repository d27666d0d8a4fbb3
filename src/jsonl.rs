//! Newline-delimited JSON input and output.

use crate::error::{Error, Result};
use crate::record::FailureRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;

/// One non-blank input line and what it parsed into.
#[derive(Debug)]
pub struct ParsedLine {
    /// Position among non-blank lines (0-based).
    pub index: usize,
    /// Line number in the source text (1-based).
    pub line: usize,
    pub record: Result<FailureRecord>,
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.strip_prefix('\u{feff}')
        .unwrap_or(text)
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(idx, raw)| (idx + 1, raw))
}

/// Parse failure records, keeping per-line errors instead of stopping at the first.
#[must_use]
pub fn parse_records(text: &str) -> Vec<ParsedLine> {
    content_lines(text)
        .enumerate()
        .map(|(index, (line, raw))| ParsedLine {
            index,
            line,
            record: FailureRecord::from_json(raw),
        })
        .collect()
}

/// Parse every non-blank line as `T`, failing on the first malformed line.
pub fn parse_all<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    content_lines(text)
        .map(|(line, raw)| {
            serde_json::from_str(raw).map_err(|e| Error::malformed(line, e.to_string()))
        })
        .collect()
}

/// Read a whole input file. A missing file is an input error, not an empty batch.
pub fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::input(format!(
            "Input file does not exist: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Render items as JSONL, one object per line, each line newline-terminated.
pub fn to_jsonl<T: Serialize>(items: &[T]) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

/// Atomically write items as JSONL, creating parent directories as needed.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let payload = to_jsonl(items)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(payload.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| Error::from(Box::new(e.error)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn blank_lines_are_ignored_and_numbering_kept() {
        let text = "\n{\"test_id\":\"a\"}\n   \n{\"test_id\":\"b\"}\n";
        let parsed = parse_records(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!((parsed[0].index, parsed[0].line), (0, 2));
        assert_eq!((parsed[1].index, parsed[1].line), (1, 4));
        assert_eq!(parsed[1].record.as_ref().unwrap().test_id, "b");
    }

    #[test]
    fn malformed_lines_are_reported_in_place() {
        let text = "{\"test_id\":\"a\"}\n{not json\n{\"test_id\":\"c\"}";
        let parsed = parse_records(text);
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].record.is_ok());
        assert!(parsed[1].record.is_err());
        assert_eq!(parsed[1].line, 2);
        assert!(parsed[2].record.is_ok());
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let parsed = parse_records("\u{feff}{\"test_id\":\"a\"}\r\n");
        assert!(parsed[0].record.is_ok());
    }

    #[test]
    fn parse_all_stops_at_first_error() {
        let err = parse_all::<Value>("{}\n\n[1\n{}").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 3, .. }));
    }

    #[test]
    fn missing_input_is_an_input_error() {
        let err = read_input(Path::new("/no/such/dir/input.jsonl")).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let items = vec![serde_json::json!({"a": 1}), serde_json::json!({"a": 2})];
        write_jsonl(&path, &items).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"a\":1}\n{\"a\":2}\n");
        let back: Vec<Value> = parse_all(&text).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn empty_batch_writes_empty_file() {
        assert_eq!(to_jsonl::<Value>(&[]).unwrap(), "");
    }
}

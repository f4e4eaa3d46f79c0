//! Framing of the encrypted gradient stream.
//!
//! One record per line: `<base64 Gx> <base64 Gy>\n`. Base64 never contains a
//! space or a newline, so no escaping is needed. Records are not indexed; their
//! position in the stream is the pixel index.

use crate::errors::EdgeError;

use itertools::Itertools;

pub const FIELD_SEPARATOR: char = ' ';
pub const RECORD_SEPARATOR: u8 = b'\n';

/// Formats one record without its trailing newline.
pub fn format_record(gx: &str, gy: &str) -> String {
    let mut record = String::with_capacity(gx.len() + gy.len() + 1);
    record.push_str(gx);
    record.push(FIELD_SEPARATOR);
    record.push_str(gy);
    record
}

/// Splits a record into its two fields. A trailing `\r\n` or `\n` is ignored.
pub fn parse_record(line: &str) -> Result<(&str, &str), EdgeError> {
    let line = line.trim_end_matches(['\n', '\r']);
    line.split(FIELD_SEPARATOR)
        .collect_tuple()
        .filter(|(gx, gy): &(&str, &str)| !gx.is_empty() && !gy.is_empty())
        .ok_or_else(|| {
            EdgeError::MalformedResponse(format!(
                "Expected two space-separated fields, got {:?}",
                truncate(line, 48)
            ))
        })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() -> Result<(), EdgeError> {
        let record = format_record("AAEC", "AQID");
        assert_eq!(record, "AAEC AQID");
        assert_eq!(parse_record(&record)?, ("AAEC", "AQID"));
        assert_eq!(parse_record("AAEC AQID\r\n")?, ("AAEC", "AQID"));
        Ok(())
    }

    #[test]
    fn test_rejects_bad_field_counts() {
        for line in ["", "AAEC", "AAEC AQID AQID", " AQID", "AAEC "] {
            assert!(
                matches!(parse_record(line), Err(EdgeError::MalformedResponse(_))),
                "{:?} should be rejected",
                line
            );
        }
    }
}

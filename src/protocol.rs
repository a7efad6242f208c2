use std::str;

use crate::codec::{self, Value};
use crate::constants::{CRLF, GET, VALUE};
use crate::errors::{Error, ErrorKind, Result};

/// One `VALUE` entry of a retrieval response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub key: String,
    pub flags: u32,
    pub length: usize,
    pub value: Value,
}

#[derive(Debug, PartialEq)]
struct Header<'a> {
    key: &'a str,
    flags: u32,
    length: usize,
}

/// Lazily walks a response transcript, yielding one item per value block.
///
/// Iteration ends at the end of the transcript or at the first line that is
/// not a value header. A malformed header yields one error and ends it too.
/// A value that fails to decode yields an error for that record only, the
/// cursor has already moved past its payload.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    transcript: &'a [u8],
    cursor: usize,
    done: bool,
}

/// Starts parsing `transcript`. Parsing holds no state outside the returned
/// iterator, so calling this again replays the same records.
pub fn parse(transcript: &[u8]) -> Blocks<'_> {
    Blocks {
        transcript,
        cursor: 0,
        done: false,
    }
}

impl<'a> Blocks<'a> {
    /// Reads up to and including the next `\n`; a trailing `\r` is dropped.
    fn read_line(&mut self) -> &'a [u8] {
        let rest = &self.transcript[self.cursor..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(position) => (&rest[..position], position + 1),
            None => (rest, rest.len()),
        };
        self.cursor += consumed;
        match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        }
    }

    fn next_record(&mut self) -> Option<Result<Response>> {
        if self.cursor >= self.transcript.len() {
            return None;
        }
        let line = self.read_line();
        let header = match parse_header(line)? {
            Ok(header) => header,
            Err(e) => return Some(Err(e)),
        };

        let start = self.cursor;
        let end = match start.checked_add(header.length) {
            Some(end) if end <= self.transcript.len() => end,
            _ => {
                let line = String::from_utf8_lossy(line).into_owned();
                return Some(Err(ErrorKind::MalformedHeader(line).into()));
            }
        };
        // The payload terminator is skipped by offset, never re-read.
        self.cursor = end + CRLF.len();

        let record = codec::decode(&self.transcript[start..end], header.flags).map(|value| {
            Response {
                key: header.key.to_owned(),
                flags: header.flags,
                length: header.length,
                value,
            }
        });
        Some(record)
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<Response>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_record();
        match &item {
            None | Some(Err(Error(ErrorKind::MalformedHeader(_), _))) => self.done = true,
            _ => {}
        }
        item
    }
}

/// `None` when the line is not a value header at all.
fn parse_header(line: &[u8]) -> Option<Result<Header<'_>>> {
    let mut fields = line.split(|&b| b == b' ');
    if fields.next()? != VALUE {
        return None;
    }
    let malformed = || ErrorKind::MalformedHeader(String::from_utf8_lossy(line).into_owned());
    let header = (|| {
        let key = str::from_utf8(fields.next()?).ok()?;
        let flags: u32 = str::from_utf8(fields.next()?).ok()?.parse().ok()?;
        let length: usize = str::from_utf8(fields.next()?).ok()?.parse().ok()?;
        Some(Header { key, flags, length })
    })();
    Some(header.ok_or_else(|| malformed().into()))
}

/// Payload length announced by a value header line.
pub(crate) fn payload_length(line: &[u8]) -> Option<usize> {
    match parse_header(line)? {
        Ok(header) => Some(header.length),
        Err(_) => None,
    }
}

/// Rejects keys memcached would refuse or that would break the command line.
pub fn check_key(key: &str, maximum: usize) -> Result<()> {
    if key.len() > maximum {
        bail!(ErrorKind::KeyLengthTooLong(key.len()));
    }
    if key.is_empty() || key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        bail!(ErrorKind::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Renders the retrieval command for one key.
pub fn build_get(key: &str) -> Vec<u8> {
    let mut command = Vec::with_capacity(GET.len() + key.len() + 2);
    command.extend_from_slice(GET.as_bytes());
    command.push(b' ');
    command.extend_from_slice(key.as_bytes());
    command.push(b'\n');
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(transcript: &[u8]) -> Vec<Result<Response>> {
        parse(transcript).collect()
    }

    #[test]
    fn empty_transcript() {
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn single_value() {
        let records = collect(b"VALUE k 4 5\r\nhello\r\n");
        assert_eq!(records.len(), 1);
        let record = records.into_iter().next().unwrap().unwrap();
        assert_eq!(record.key, "k");
        assert_eq!(record.flags, 4);
        assert_eq!(record.length, 5);
        assert_eq!(record.value, json!("hello"));
    }

    #[test]
    fn many_values() {
        let transcript = b"VALUE a 4 1\r\n1\r\nVALUE b 4 7\r\n{\"x\":2}\r\nVALUE c 4 2\r\n[]\r\n";
        let records: Vec<Response> = parse(transcript).map(|r| r.unwrap()).collect();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(records[0].value, json!(1));
        assert_eq!(records[1].value, json!({"x": 2}));
        assert_eq!(records[2].value, json!([]));
    }

    #[test]
    fn payload_with_line_breaks() {
        let records = collect(b"VALUE k 4 8\r\n\"a\\r\\nb\"\r\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records.into_iter().next().unwrap().unwrap().value, json!("a\r\nb"));
        let records = collect(b"VALUE k 4 4\r\nx\r\ny\r\n");
        assert_eq!(records.into_iter().next().unwrap().unwrap().value, json!("x\r\ny"));
    }

    #[test]
    fn stops_at_other_lines() {
        let records = collect(b"VALUE a 4 1\r\n1\r\nERROR\r\nVALUE b 4 1\r\n2\r\n");
        assert_eq!(records.len(), 1);
        assert!(collect(b"STORED\r\n").is_empty());
    }

    #[test]
    fn restartable() {
        let transcript = b"VALUE a 4 1\r\n1\r\nVALUE b 4 1\r\n2\r\n";
        let first: Vec<Response> = parse(transcript).map(|r| r.unwrap()).collect();
        let second: Vec<Response> = parse(transcript).map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn unsupported_flags_are_isolated() {
        let records = collect(b"VALUE a 99 3\r\nabc\r\nVALUE b 4 1\r\n7\r\n");
        assert_eq!(records.len(), 2);
        match &records[0] {
            Err(Error(ErrorKind::UnsupportedEncoding(99), _)) => {}
            r => panic!("Expected UnsupportedEncoding, got {:?}", r),
        }
        assert_eq!(records[1].as_ref().unwrap().value, json!(7));
    }

    #[test]
    fn malformed_header_ends_iteration() {
        for transcript in &[
            &b"VALUE a x 1\r\n1\r\nVALUE b 4 1\r\n2\r\n"[..],
            &b"VALUE a 4\r\n1\r\n"[..],
            &b"VALUE a 4 50\r\n1\r\n"[..],
        ] {
            let records = collect(transcript);
            assert_eq!(records.len(), 1);
            match &records[0] {
                Err(Error(ErrorKind::MalformedHeader(_), _)) => {}
                r => panic!("Expected MalformedHeader, got {:?}", r),
            }
        }
    }

    #[test]
    fn huge_declared_length_is_malformed() {
        let records = collect(b"VALUE k 4 18446744073709551615\r\nx\r\n");
        assert_eq!(records.len(), 1);
        match &records[0] {
            Err(Error(ErrorKind::MalformedHeader(_), _)) => {}
            r => panic!("Expected MalformedHeader, got {:?}", r),
        }
    }

    #[test]
    fn extra_header_fields_are_ignored() {
        let records = collect(b"VALUE a 4 1 12345\r\n1\r\n");
        assert_eq!(records[0].as_ref().unwrap().value, json!(1));
    }

    #[test]
    fn header_length() {
        assert_eq!(payload_length(b"VALUE a 4 17"), Some(17));
        assert_eq!(payload_length(b"VALUE a 4"), None);
        assert_eq!(payload_length(b"END"), None);
    }

    #[test]
    fn get_command() {
        assert_eq!(build_get("foo"), b"get foo\n".to_vec());
    }

    #[test]
    fn keys() {
        assert!(check_key("Hello:Get", 250).is_ok());
        let big_key: String = std::iter::repeat("0").take(260).collect();
        match check_key(&big_key, 250) {
            Err(Error(ErrorKind::KeyLengthTooLong(260), _)) => {}
            r => panic!("This should be KeyLengthTooLong and not {:?}", r),
        }
        for key in &["", "with space", "line\nbreak", "tab\t"] {
            match check_key(key, 250) {
                Err(Error(ErrorKind::InvalidKey(_), _)) => {}
                r => panic!("{:?} should be rejected, got {:?}", key, r),
            }
        }
    }
}

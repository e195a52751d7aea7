// MARC21 exchange format (ISO 2709) reader/writer and MARCMaker text

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use nzn_recon::marc::{FieldContent, MarcField, MarcRecord, Subfield};

use crate::error::IoError;

const LEADER_LEN: usize = 24;
const DIRECTORY_ENTRY_LEN: usize = 12;
/// Leader/00-04 holds the record length as five digits.
const LENGTH_DIGITS: usize = 5;

pub const FIELD_TERMINATOR: u8 = 0x1E;
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// Streams records out of a concatenated ISO 2709 file.
///
/// Decoding stops at the first malformed record: the iterator yields the
/// error once and then ends.
pub struct MarcReader<R> {
    inner: BufReader<R>,
    offset: u64,
    failed: bool,
}

impl MarcReader<File> {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::io(path, e))?;
        Ok(Self::new(file))
    }
}

impl<R: Read> MarcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            offset: 0,
            failed: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn next_byte(&mut self) -> Result<Option<u8>, IoError> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.error(self.offset, e.to_string())),
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<MarcRecord>, IoError> {
        // Some exports put a newline between records.
        let first = loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(b) if b.is_ascii_whitespace() => continue,
                Some(b) => break b,
            }
        };
        let start = self.offset - 1;

        let mut head = [0u8; LENGTH_DIGITS];
        head[0] = first;
        self.fill(&mut head[1..], start)?;
        let length = parse_number(&head, "record length").map_err(|m| self.error(start, m))?;
        if length <= LEADER_LEN {
            return Err(self.error(start, format!("record length {length} is shorter than the leader")));
        }

        let mut bytes = vec![0u8; length];
        bytes[..LENGTH_DIGITS].copy_from_slice(&head);
        self.fill(&mut bytes[LENGTH_DIGITS..], start)?;

        decode(&bytes).map(Some).map_err(|m| self.error(start, m))
    }

    fn fill(&mut self, buf: &mut [u8], start: u64) -> Result<(), IoError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(self.error(start, "truncated record".to_string()))
            }
            Err(e) => Err(self.error(start, e.to_string())),
        }
    }

    fn error(&self, offset: u64, message: String) -> IoError {
        IoError::Marc { offset, message }
    }
}

impl<R: Read> Iterator for MarcReader<R> {
    type Item = Result<MarcRecord, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode one complete record (leader through record terminator).
pub fn decode(bytes: &[u8]) -> Result<MarcRecord, String> {
    if bytes.len() <= LEADER_LEN {
        return Err(format!("record of {} bytes has no directory", bytes.len()));
    }
    if bytes.last() != Some(&RECORD_TERMINATOR) {
        return Err("missing record terminator".to_string());
    }
    let leader = decode_text(&bytes[..LEADER_LEN]);
    let base = parse_number(&bytes[12..17], "base address")?;
    if base <= LEADER_LEN || base > bytes.len() {
        return Err(format!("base address {base} outside record of {} bytes", bytes.len()));
    }

    let directory = bytes[LEADER_LEN..base]
        .strip_suffix(&[FIELD_TERMINATOR])
        .ok_or_else(|| "directory is not terminated".to_string())?;
    if directory.len() % DIRECTORY_ENTRY_LEN != 0 {
        return Err(format!("directory length {} is not a multiple of 12", directory.len()));
    }

    let mut record = MarcRecord::new(leader);
    for entry in directory.chunks_exact(DIRECTORY_ENTRY_LEN) {
        let tag = decode_text(&entry[..3]);
        let length = parse_number(&entry[3..7], "field length")?;
        let start = parse_number(&entry[7..12], "field start")?;
        let from = base + start;
        let data = bytes
            .get(from..from + length)
            .ok_or_else(|| format!("field {tag} runs past the end of the record"))?;
        let data = data
            .strip_suffix(&[FIELD_TERMINATOR])
            .ok_or_else(|| format!("field {tag} is not terminated"))?;
        record.fields.push(decode_field(tag, data));
    }
    Ok(record)
}

fn decode_field(tag: String, data: &[u8]) -> MarcField {
    if MarcField::is_control_tag(&tag) {
        return MarcField {
            tag,
            content: FieldContent::Control(decode_text(data)),
        };
    }

    let indicator = |i: usize| data.get(i).map(|b| *b as char).unwrap_or(' ');
    let indicators = [indicator(0), indicator(1)];
    let body = data.get(2..).unwrap_or(&[]);

    let subfields = body
        .split(|b| *b == SUBFIELD_DELIMITER)
        .skip(1)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let text = decode_text(chunk);
            let mut chars = text.chars();
            let code = chars.next().unwrap_or(' ');
            Subfield {
                code,
                value: chars.as_str().to_string(),
            }
        })
        .collect();

    MarcField {
        tag,
        content: FieldContent::Data { indicators, subfields },
    }
}

/// UTF-8, falling back to Windows-1252 for legacy records.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn parse_number(bytes: &[u8], what: &str) -> Result<usize, String> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| format!("invalid {what} '{}'", String::from_utf8_lossy(bytes)))
}

/// Encode as ISO 2709 with UTF-8 text. Leader length, base address and
/// character coding (leader/09) are recomputed.
pub fn encode(record: &MarcRecord) -> Vec<u8> {
    let mut directory = Vec::new();
    let mut data = Vec::new();
    let mut utf8 = [0u8; 4];

    for field in &record.fields {
        let start = data.len();
        match &field.content {
            FieldContent::Control(value) => data.extend_from_slice(value.as_bytes()),
            FieldContent::Data { indicators, subfields } => {
                for c in indicators {
                    data.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                }
                for sub in subfields {
                    data.push(SUBFIELD_DELIMITER);
                    data.extend_from_slice(sub.code.encode_utf8(&mut utf8).as_bytes());
                    data.extend_from_slice(sub.value.as_bytes());
                }
            }
        }
        data.push(FIELD_TERMINATOR);
        let entry = format!("{:>3.3}{:04}{:05}", field.tag, data.len() - start, start);
        directory.extend_from_slice(entry.as_bytes());
    }
    directory.push(FIELD_TERMINATOR);
    data.push(RECORD_TERMINATOR);

    let base = LEADER_LEN + directory.len();
    let total = base + data.len();

    let mut leader: Vec<u8> = record.leader.bytes().take(LEADER_LEN).collect();
    leader.resize(LEADER_LEN, b' ');
    leader[..5].copy_from_slice(format!("{:05}", total % 100_000).as_bytes());
    leader[9] = b'a';
    leader[12..17].copy_from_slice(format!("{:05}", base % 100_000).as_bytes());

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&leader);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&data);
    out
}

/// MARCMaker mnemonic text: one `=TAG  ` line per field, blanks in the
/// leader, control fields and indicators written as `\`.
pub fn to_mnemonic(record: &MarcRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=LDR  {}", record.leader.replace(' ', "\\"));
    for field in &record.fields {
        match &field.content {
            FieldContent::Control(value) => {
                let _ = writeln!(out, "={}  {}", field.tag, escape(value).replace(' ', "\\"));
            }
            FieldContent::Data { indicators, subfields } => {
                let _ = write!(out, "={}  ", field.tag);
                for c in indicators {
                    out.push(if *c == ' ' { '\\' } else { *c });
                }
                for sub in subfields {
                    let _ = write!(out, "${}{}", sub.code, escape(&sub.value));
                }
                out.push('\n');
            }
        }
    }
    out.push('\n');
    out
}

fn escape(value: &str) -> String {
    value.replace('$', "{dollar}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MarcRecord {
        let mut record = MarcRecord::new("00000cas a2200000 a 4500");
        record
            .push_control("001", "9912345")
            .push_control("008", "860101d18721943nz dr np      0   a0eng d")
            .push_data("035", [' ', ' '], &[('a', "(Nz)77")])
            .push_data("245", ['0', '0'], &[('a', "Inangahua times"), ('h', "[microform].")])
            .push_data("260", [' ', ' '], &[('a', "Reefton, N.Z. :"), ('b', "W. Mathieson")]);
        record
    }

    #[test]
    fn test_encode_then_decode() {
        let bytes = encode(&sample());
        assert_eq!(*bytes.last().unwrap(), RECORD_TERMINATOR);
        assert_eq!(&bytes[..5], format!("{:05}", bytes.len()).as_bytes());

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.fields, sample().fields);
        assert_eq!(decoded.record_type(), Some('a'));
        assert_eq!(decoded.bib_level(), Some('s'));
    }

    #[test]
    fn test_reader_streams_concatenated_records() {
        let mut second = sample();
        second.fields[0] = MarcField {
            tag: "001".into(),
            content: FieldContent::Control("2".into()),
        };
        let mut bytes = encode(&sample());
        bytes.push(b'\n');
        bytes.extend(encode(&second));
        bytes.extend_from_slice(b"\r\n");

        let records: Vec<MarcRecord> = MarcReader::new(bytes.as_slice())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].control_field("001"), Some("2"));
    }

    #[test]
    fn test_truncated_record_is_an_error_then_ends() {
        let bytes = encode(&sample());
        let cut = &bytes[..bytes.len() - 10];
        let mut reader = MarcReader::new(cut);
        match reader.next() {
            Some(Err(IoError::Marc { offset, message })) => {
                assert_eq!(offset, 0);
                assert!(message.contains("truncated"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_bad_length_prefix() {
        let mut reader = MarcReader::new(&b"abcde0000000000000000000000"[..]);
        assert!(matches!(reader.next(), Some(Err(IoError::Marc { .. }))));
    }

    #[test]
    fn test_field_past_end_is_rejected() {
        let mut bytes = encode(&sample());
        // Inflate the first directory entry's length.
        bytes[LEADER_LEN + 3..LEADER_LEN + 7].copy_from_slice(b"9999");
        let err = decode(&bytes).unwrap_err();
        assert!(err.contains("001"), "got: {err}");
    }

    #[test]
    fn test_missing_record_terminator_is_rejected() {
        let mut bytes = encode(&sample());
        let n = bytes.len();
        bytes[n - 2] = b'X';
        bytes[n - 1] = b'Y';
        let err = decode(&bytes).unwrap_err();
        assert!(err.contains("record terminator"), "got: {err}");
    }

    #[test]
    fn test_unterminated_field_is_rejected() {
        let mut bytes = encode(&sample());
        // Last byte of the 001 value is its field terminator.
        let base = parse_number(&bytes[12..17], "base address").unwrap();
        let end = base + "9912345".len();
        assert_eq!(bytes[end], FIELD_TERMINATOR);
        bytes[end] = b'6';
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err, "field 001 is not terminated");
    }

    #[test]
    fn test_legacy_bytes_fall_back_to_windows_1252() {
        let mut record = MarcRecord::new("00000cas  2200000 a 4500");
        record.push_data("245", ['0', '0'], &[('a', "Te Korimako")]);
        let mut bytes = encode(&record);
        // Swap the 'o' in "Korimako" for 0xF4 (ô in Windows-1252).
        let pos = bytes.windows(4).position(|w| w == b"mako").unwrap() + 3;
        bytes[pos] = 0xF4;

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.fields[0].first_subfield('a'), Some("Te Korimakô"));
    }

    #[test]
    fn test_mnemonic_text() {
        let text = to_mnemonic(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=LDR  00000cas\\a2200000\\a\\4500");
        assert_eq!(lines[1], "=001  9912345");
        assert_eq!(lines[3], "=035  \\\\$a(Nz)77");
        assert_eq!(lines[4], "=245  00$aInangahua times$h[microform].");
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_mnemonic_escapes_dollar() {
        let mut record = MarcRecord::new("00000cas a2200000 a 4500");
        record.push_data("300", [' ', ' '], &[('a', "$5 per annum")]);
        assert!(to_mnemonic(&record).contains("$a{dollar}5 per annum"));
    }
}

//! Trace record decoding.
//!
//! A trace holds one access per line: an instruction-kind marker followed by
//! a hexadecimal virtual address, optionally suffixed with `,size`. Fetches
//! start at column 0 while data accesses are usually indented by one space
//! (`I  0023C790,2`, ` L 7FF000398,8`); bare lines such as `S 0x0800` are
//! accepted too.

use std::io::BufRead;

use log::warn;

use crate::address::{AccessKind, MemoryAccess};
use crate::error::{Result, VmError};

fn malformed(line: usize, reason: impl Into<String>) -> VmError {
    VmError::MalformedRecord { line, reason: reason.into() }
}

fn parse_address(line_index: usize, field: &str) -> Result<u64> {
    let digits = field.split(',').next().unwrap_or_default();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);

    if digits.is_empty() {
        return Err(malformed(line_index, "missing address"));
    }
    // zero-padded addresses are fine as long as the value fits
    let significant = digits.trim_start_matches('0');
    if significant.len() > 16 {
        return Err(malformed(line_index, format!("address {digits} is wider than 64 bits")));
    }

    let padded = format!("{significant:0>16}");
    let mut bytes = [0u8; 8];

    hex::decode_to_slice(&padded, &mut bytes)
        .map_err(|e| malformed(line_index, format!("bad address {digits}: {e}")))?;

    Ok(u64::from_be_bytes(bytes))
}

/// Decodes a single trace line.
pub fn parse_line(line_index: usize, line: &str) -> Result<MemoryAccess> {
    let line = line.trim_start();

    let mut chars = line.chars();
    let marker = chars
        .next()
        .ok_or_else(|| malformed(line_index, "empty line"))?;

    let kind = AccessKind::from_marker(marker)
        .ok_or_else(|| malformed(line_index, format!("unknown instruction kind {marker:?}")))?;

    let field = chars
        .as_str()
        .split_whitespace()
        .next()
        .ok_or_else(|| malformed(line_index, "missing address"))?;

    let address = parse_address(line_index, field)?;

    Ok(MemoryAccess::new(line_index, kind, address))
}

/// Reads a whole trace, skipping lines that fail to decode.
///
/// Skipped lines still consume a line index so that the indices seen by the
/// replacers line up with the file.
pub fn read_trace<R: BufRead>(reader: R) -> Result<Vec<MemoryAccess>> {
    let mut accesses = Vec::new();

    for (line_index, line) in reader.split(b'\n').enumerate() {
        let line = line?;

        let line = match std::str::from_utf8(&line) {
            Ok(line) => line,
            Err(e) => {
                warn!("trace: skipping record: {}", malformed(line_index, format!("not utf-8: {e}")));
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line_index, line) {
            Ok(access) => accesses.push(access),
            Err(err) if err.is_recoverable() => warn!("trace: skipping record: {}", err),
            Err(err) => return Err(err),
        }
    }

    Ok(accesses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_at_column_zero() {
        let access = parse_line(0, "I  0023C790,2").unwrap();

        assert_eq!(access.kind, AccessKind::Fetch);
        assert_eq!(access.address, 0x0023_C790);
        assert_eq!(access.page_number, 0x0023_C790 >> 11);
        assert_eq!(access.offset, 0x0023_C790 & 0x7FF);
    }

    #[test]
    fn test_parse_indented_data_access() {
        let store = parse_line(1, " S 7ff000398,8").unwrap();
        let modify = parse_line(2, " M 0421c7f0,4").unwrap();

        assert_eq!(store.kind, AccessKind::Store);
        assert_eq!(store.address, 0x7_FF00_0398);
        assert_eq!(modify.kind, AccessKind::Modify);
        assert_eq!(modify.line_index, 2);
    }

    #[test]
    fn test_parse_bare_prefixed_address() {
        let access = parse_line(5, "L 0x0800").unwrap();

        assert_eq!(access.kind, AccessKind::Load);
        assert_eq!(access.page_number, 1);
        assert_eq!(access.offset, 0);
    }

    #[test]
    fn test_unknown_kind_is_malformed() {
        let err = parse_line(9, "==1234== lackey header").unwrap_err();

        assert!(matches!(err, VmError::MalformedRecord { line: 9, .. }));
    }

    #[test]
    fn test_bad_address_is_malformed() {
        assert!(matches!(parse_line(0, "L"), Err(VmError::MalformedRecord { .. })));
        assert!(matches!(parse_line(0, "L 0x"), Err(VmError::MalformedRecord { .. })));
        assert!(matches!(parse_line(0, "L zz12"), Err(VmError::MalformedRecord { .. })));
        assert!(matches!(
            parse_line(0, "L 11112222333344445"),
            Err(VmError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_leading_zeros_do_not_count_toward_width() {
        let access = parse_line(0, "L 0x00000000000000000800").unwrap();

        assert_eq!(access.address, 0x800);
        assert_eq!(parse_line(0, "L 0").unwrap().address, 0);
        assert_eq!(parse_line(0, "L ffffffffffffffff").unwrap().address, u64::MAX);
    }

    #[test]
    fn test_read_trace_skips_non_utf8_line() {
        let input: &[u8] = b"L 0x0000\n\xff\xfe garbage\nL 0x0800\r\n";
        let accesses = read_trace(input).unwrap();

        assert_eq!(accesses.len(), 2);
        assert_eq!(accesses[0].page_number, 0);
        assert_eq!(accesses[1].line_index, 2);
        assert_eq!(accesses[1].page_number, 1);
    }

    #[test]
    fn test_read_trace_skips_bad_lines_but_keeps_indices() {
        let input = "L 0x0000\nX 0x0800\n\n S 1000,4\n";
        let accesses = read_trace(input.as_bytes()).unwrap();

        assert_eq!(accesses.len(), 2);
        assert_eq!(accesses[0].line_index, 0);
        assert_eq!(accesses[1].line_index, 3);
        assert_eq!(accesses[1].kind, AccessKind::Store);
    }
}

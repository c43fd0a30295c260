//! Binary read/write of keyword records.
//!
//! Wire layout (all integers big-endian):
//!
//! ```text
//! | i32 16 | keyword (8 bytes) | i32 count | mnemonic (4 bytes) | i32 16 |
//! | i32 block_bytes | <= block_limit elements | i32 block_bytes |  ... repeated
//! ```
//!
//! LOGI elements are 4 bytes: 0 is false, -1 (all bits set) is true.

use crate::error::{EclError, EclResult};
use crate::record::{EclData, EclKind, EclRecord, STRING_WIDTH};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const HEADER_BYTES: i32 = (STRING_WIDTH + 4 + 4) as i32;
const LOGI_TRUE: i32 = -1;
const LOGI_FALSE: i32 = 0;

/// Write one record.
pub fn write_record<W: Write>(w: &mut W, record: &EclRecord) -> EclResult<()> {
    w.write_i32::<BigEndian>(HEADER_BYTES)?;
    w.write_all(&pad8(record.keyword()))?;
    w.write_i32::<BigEndian>(record.len() as i32)?;
    w.write_all(record.kind().mnemonic().as_bytes())?;
    w.write_i32::<BigEndian>(HEADER_BYTES)?;

    let kind = record.kind();
    let limit = kind.block_limit();
    match record.data() {
        EclData::Inte(v) => write_blocks(w, v, limit, kind, |w, x| {
            Ok(w.write_i32::<BigEndian>(*x)?)
        })?,
        EclData::Real(v) => write_blocks(w, v, limit, kind, |w, x| {
            Ok(w.write_f32::<BigEndian>(*x)?)
        })?,
        EclData::Doub(v) => write_blocks(w, v, limit, kind, |w, x| {
            Ok(w.write_f64::<BigEndian>(*x)?)
        })?,
        EclData::Logi(v) => write_blocks(w, v, limit, kind, |w, x| {
            Ok(w.write_i32::<BigEndian>(if *x { LOGI_TRUE } else { LOGI_FALSE })?)
        })?,
        EclData::Char(v) => write_blocks(w, v, limit, kind, |w, s| {
            if !s.is_ascii() || s.len() > STRING_WIDTH {
                return Err(EclError::NonAsciiKeyword(s.clone()));
            }
            Ok(w.write_all(&pad8(s))?)
        })?,
        EclData::CharN(width, v) => {
            let width = *width;
            write_blocks(w, v, limit, kind, move |w, s| {
                if !s.is_ascii() || s.len() > width {
                    return Err(EclError::NonAsciiKeyword(s.clone()));
                }
                let mut buf = vec![b' '; width];
                buf[..s.len()].copy_from_slice(s.as_bytes());
                Ok(w.write_all(&buf)?)
            })?
        }
        EclData::Mess => {}
    }
    Ok(())
}

fn write_blocks<W: Write, T>(
    w: &mut W,
    elems: &[T],
    limit: usize,
    kind: EclKind,
    mut put: impl FnMut(&mut W, &T) -> EclResult<()>,
) -> EclResult<()> {
    for chunk in elems.chunks(limit.max(1)) {
        let bytes = (chunk.len() * kind.element_size()) as i32;
        w.write_i32::<BigEndian>(bytes)?;
        for e in chunk {
            put(w, e)?;
        }
        w.write_i32::<BigEndian>(bytes)?;
    }
    Ok(())
}

/// Read one record; `Ok(None)` on clean end-of-stream.
pub fn read_record<R: Read>(r: &mut R) -> EclResult<Option<EclRecord>> {
    let head = match try_read_i32(r)? {
        Some(v) => v,
        None => return Ok(None),
    };
    if head != HEADER_BYTES {
        return Err(EclError::BadMarker {
            expected: HEADER_BYTES,
            found: head,
        });
    }

    let keyword = read_str8(r)?;
    let count = r.read_i32::<BigEndian>()?;
    let mut mnemonic = [0_u8; 4];
    r.read_exact(&mut mnemonic)?;
    let kind = EclKind::from_mnemonic(&String::from_utf8_lossy(&mnemonic))?;
    expect_marker(r, HEADER_BYTES)?;

    if count < 0 {
        return Err(EclError::NegativeCount { keyword, count });
    }
    let count = count as usize;

    let data = match kind {
        EclKind::Mess => EclData::Mess,
        EclKind::Inte => EclData::Inte(read_blocks(r, count, kind, &keyword, |r| {
            Ok(r.read_i32::<BigEndian>()?)
        })?),
        EclKind::Real => EclData::Real(read_blocks(r, count, kind, &keyword, |r| {
            Ok(r.read_f32::<BigEndian>()?)
        })?),
        EclKind::Doub => EclData::Doub(read_blocks(r, count, kind, &keyword, |r| {
            Ok(r.read_f64::<BigEndian>()?)
        })?),
        EclKind::Logi => EclData::Logi(read_blocks(r, count, kind, &keyword, |r| {
            Ok(r.read_i32::<BigEndian>()? != LOGI_FALSE)
        })?),
        EclKind::Char => EclData::Char(read_blocks(r, count, kind, &keyword, read_str8)?),
        EclKind::CharN(width) => EclData::CharN(
            width,
            read_blocks(r, count, kind, &keyword, |r| read_strn(r, width))?,
        ),
    };

    EclRecord::new(&keyword, data).map(Some)
}

fn read_blocks<R: Read, T>(
    r: &mut R,
    count: usize,
    kind: EclKind,
    keyword: &str,
    mut get: impl FnMut(&mut R) -> EclResult<T>,
) -> EclResult<Vec<T>> {
    let mut out = Vec::with_capacity(count);
    let limit = kind.block_limit();
    while out.len() < count {
        let chunk = (count - out.len()).min(limit);
        let expected = (chunk * kind.element_size()) as i32;
        let marker = r.read_i32::<BigEndian>().map_err(|_| EclError::Truncated {
            keyword: keyword.to_string(),
        })?;
        if marker != expected {
            return Err(EclError::BadMarker {
                expected,
                found: marker,
            });
        }
        for _ in 0..chunk {
            out.push(get(r).map_err(|_| EclError::Truncated {
                keyword: keyword.to_string(),
            })?);
        }
        expect_marker(r, expected)?;
    }
    Ok(out)
}

/// Write a whole file of records.
pub fn write_records(path: &Path, records: &[EclRecord]) -> EclResult<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for record in records {
        write_record(&mut w, record)?;
    }
    w.flush()?;
    Ok(())
}

/// Read a whole file of records.
pub fn read_records(path: &Path) -> EclResult<Vec<EclRecord>> {
    let mut r = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    while let Some(record) = read_record(&mut r)? {
        out.push(record);
    }
    Ok(out)
}

fn pad8(s: &str) -> [u8; STRING_WIDTH] {
    let mut buf = [b' '; STRING_WIDTH];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    buf
}

fn read_str8<R: Read>(r: &mut R) -> EclResult<String> {
    read_strn(r, STRING_WIDTH)
}

fn read_strn<R: Read>(r: &mut R, width: usize) -> EclResult<String> {
    let mut buf = vec![0_u8; width];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).trim_end().to_string())
}

fn expect_marker<R: Read>(r: &mut R, expected: i32) -> EclResult<()> {
    let found = r.read_i32::<BigEndian>()?;
    if found != expected {
        return Err(EclError::BadMarker { expected, found });
    }
    Ok(())
}

/// Read an i32; `Ok(None)` if the stream ends exactly here.
fn try_read_i32<R: Read>(r: &mut R) -> EclResult<Option<i32>> {
    let mut buf = [0_u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(EclError::Truncated {
                keyword: String::new(),
            });
        }
        filled += n;
    }
    Ok(Some(i32::from_be_bytes(buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn round_trip(record: EclRecord) -> EclRecord {
        let mut buf = Vec::new();
        write_record(&mut buf, &record).unwrap();
        read_record(&mut Cursor::new(buf)).unwrap().unwrap()
    }

    #[test]
    fn inte_round_trip() {
        let r = EclRecord::new("DIMENS", EclData::Inte(vec![3, 10, 10, 5, 0, -1])).unwrap();
        assert_eq!(round_trip(r.clone()), r);
    }

    #[test]
    fn char_round_trip_trims_padding() {
        let r = EclRecord::new(
            "KEYWORDS",
            EclData::Char(vec!["WOPR".into(), "FOPR".into(), "TIME".into()]),
        )
        .unwrap();
        let back = round_trip(r);
        assert_eq!(back.chars().unwrap(), &["WOPR", "FOPR", "TIME"]);
    }

    #[test]
    fn large_real_record_is_blocked() {
        // 2500 elements force three payload blocks of 1000/1000/500.
        let values: Vec<f32> = (0..2500).map(|i| i as f32 * 0.5).collect();
        let r = EclRecord::new("PARAMS", EclData::Real(values.clone())).unwrap();

        let mut buf = Vec::new();
        write_record(&mut buf, &r).unwrap();
        // header frame + three block frames
        let payload = 2500 * 4;
        assert_eq!(buf.len(), (4 + 16 + 4) + payload + 3 * 8);

        let back = read_record(&mut Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(back.real().unwrap(), values.as_slice());
    }

    #[test]
    fn wide_char_round_trip() {
        let r = EclRecord::new(
            "NAMES",
            EclData::CharN(12, vec!["LONG-WELL-A1".into(), "P2".into()]),
        )
        .unwrap();
        let back = round_trip(r);
        assert_eq!(back.kind(), EclKind::CharN(12));
        assert_eq!(back.chars().unwrap(), &["LONG-WELL-A1", "P2"]);
    }

    #[test]
    fn logi_round_trip() {
        let r = EclRecord::new("LOGIHEAD", EclData::Logi(vec![true, false, true])).unwrap();
        assert_eq!(round_trip(r.clone()), r);
    }

    #[test]
    fn mess_round_trip() {
        let r = EclRecord::new("SEQHDR", EclData::Mess).unwrap();
        assert_eq!(round_trip(r.clone()), r);
    }

    #[test]
    fn bad_marker_is_reported() {
        let r = EclRecord::new("UNITS", EclData::Char(vec!["SM3/DAY".into()])).unwrap();
        let mut buf = Vec::new();
        write_record(&mut buf, &r).unwrap();
        buf[3] = 99; // corrupt the leading marker
        let err = read_record(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, EclError::BadMarker { .. }));
    }

    #[test]
    fn truncated_payload_is_reported() {
        let r = EclRecord::new("PARAMS", EclData::Real(vec![1.0, 2.0, 3.0])).unwrap();
        let mut buf = Vec::new();
        write_record(&mut buf, &r).unwrap();
        buf.truncate(buf.len() - 6);
        let err = read_record(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(
            err,
            EclError::Truncated { .. } | EclError::BadMarker { .. }
        ));
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_record(&mut cursor).unwrap().is_none());
    }

    proptest! {
        #[test]
        fn prop_inte_round_trip(values in proptest::collection::vec(any::<i32>(), 0..3000)) {
            let r = EclRecord::new("INTEHEAD", EclData::Inte(values)).unwrap();
            prop_assert_eq!(round_trip(r.clone()), r);
        }

        #[test]
        fn prop_doub_round_trip(values in proptest::collection::vec(any::<f64>().prop_filter("finite", |v| v.is_finite()), 0..1200)) {
            let r = EclRecord::new("STARTDAT", EclData::Doub(values)).unwrap();
            prop_assert_eq!(round_trip(r.clone()), r);
        }
    }
}

//! Record and payload types.

use crate::error::{EclError, EclResult};

/// Width of every keyword, unit and CHAR element on the wire.
pub const STRING_WIDTH: usize = 8;

/// Payload type of a record, identified by a 4-character mnemonic on the wire.
///
/// `CharN` covers the `C0nn` family: fixed-width strings wider than the
/// default 8 characters (long well names in `NAMES` records).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EclKind {
    Inte,
    Real,
    Doub,
    Char,
    CharN(usize),
    Logi,
    Mess,
}

impl EclKind {
    pub fn mnemonic(self) -> String {
        match self {
            EclKind::Inte => "INTE".to_string(),
            EclKind::Real => "REAL".to_string(),
            EclKind::Doub => "DOUB".to_string(),
            EclKind::Char => "CHAR".to_string(),
            EclKind::CharN(width) => format!("C{:03}", width),
            EclKind::Logi => "LOGI".to_string(),
            EclKind::Mess => "MESS".to_string(),
        }
    }

    pub fn from_mnemonic(m: &str) -> EclResult<Self> {
        match m {
            "INTE" => Ok(EclKind::Inte),
            "REAL" => Ok(EclKind::Real),
            "DOUB" => Ok(EclKind::Doub),
            "CHAR" => Ok(EclKind::Char),
            "LOGI" => Ok(EclKind::Logi),
            "MESS" => Ok(EclKind::Mess),
            other => {
                if let Some(width) = other
                    .strip_prefix('C')
                    .and_then(|digits| digits.parse::<usize>().ok())
                    .filter(|w| *w > 0)
                {
                    Ok(EclKind::CharN(width))
                } else {
                    Err(EclError::UnknownKind(other.to_string()))
                }
            }
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            EclKind::Inte | EclKind::Real | EclKind::Logi => 4,
            EclKind::Doub | EclKind::Char => 8,
            EclKind::CharN(width) => width,
            EclKind::Mess => 0,
        }
    }

    /// Maximum elements per payload block. Character data uses a smaller
    /// block than numeric data; both limits are fixed by the format.
    pub fn block_limit(self) -> usize {
        match self {
            EclKind::Char | EclKind::CharN(_) => 105,
            _ => 1000,
        }
    }
}

/// Typed record payload.
#[derive(Clone, Debug, PartialEq)]
pub enum EclData {
    Inte(Vec<i32>),
    Real(Vec<f32>),
    Doub(Vec<f64>),
    /// 8-character strings, stored trimmed of trailing padding.
    Char(Vec<String>),
    /// Fixed-width strings wider than 8 characters.
    CharN(usize, Vec<String>),
    Logi(Vec<bool>),
    /// Message record: keyword only, no payload.
    Mess,
}

impl EclData {
    pub fn kind(&self) -> EclKind {
        match self {
            EclData::Inte(_) => EclKind::Inte,
            EclData::Real(_) => EclKind::Real,
            EclData::Doub(_) => EclKind::Doub,
            EclData::Char(_) => EclKind::Char,
            EclData::CharN(width, _) => EclKind::CharN(*width),
            EclData::Logi(_) => EclKind::Logi,
            EclData::Mess => EclKind::Mess,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EclData::Inte(v) => v.len(),
            EclData::Real(v) => v.len(),
            EclData::Doub(v) => v.len(),
            EclData::Char(v) => v.len(),
            EclData::CharN(_, v) => v.len(),
            EclData::Logi(v) => v.len(),
            EclData::Mess => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One keyword record: 8-char keyword plus typed payload.
#[derive(Clone, Debug, PartialEq)]
pub struct EclRecord {
    keyword: String,
    data: EclData,
}

impl EclRecord {
    /// Build a record. The keyword must be ASCII and at most 8 characters;
    /// it is stored trimmed and space-padded only on the wire.
    pub fn new(keyword: &str, data: EclData) -> EclResult<Self> {
        if !keyword.is_ascii() || keyword.len() > STRING_WIDTH {
            return Err(EclError::NonAsciiKeyword(keyword.to_string()));
        }
        Ok(Self {
            keyword: keyword.trim_end().to_string(),
            data,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn data(&self) -> &EclData {
        &self.data
    }

    pub fn kind(&self) -> EclKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn mismatch(&self, expected: &'static str) -> EclError {
        EclError::KindMismatch {
            keyword: self.keyword.clone(),
            expected,
            found: self.kind().mnemonic(),
        }
    }

    pub fn inte(&self) -> EclResult<&[i32]> {
        match &self.data {
            EclData::Inte(v) => Ok(v),
            _ => Err(self.mismatch("INTE")),
        }
    }

    pub fn real(&self) -> EclResult<&[f32]> {
        match &self.data {
            EclData::Real(v) => Ok(v),
            _ => Err(self.mismatch("REAL")),
        }
    }

    pub fn doub(&self) -> EclResult<&[f64]> {
        match &self.data {
            EclData::Doub(v) => Ok(v),
            _ => Err(self.mismatch("DOUB")),
        }
    }

    pub fn chars(&self) -> EclResult<&[String]> {
        match &self.data {
            EclData::Char(v) => Ok(v),
            EclData::CharN(_, v) => Ok(v),
            _ => Err(self.mismatch("CHAR")),
        }
    }

    pub fn logi(&self) -> EclResult<&[bool]> {
        match &self.data {
            EclData::Logi(v) => Ok(v),
            _ => Err(self.mismatch("LOGI")),
        }
    }
}

/// First record with the given keyword, if any.
pub fn find<'a>(records: &'a [EclRecord], keyword: &str) -> Option<&'a EclRecord> {
    records.iter().find(|r| r.keyword() == keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_is_trimmed() {
        let r = EclRecord::new("FOPR    ", EclData::Mess).unwrap();
        assert_eq!(r.keyword(), "FOPR");
    }

    #[test]
    fn long_keyword_rejected() {
        assert!(EclRecord::new("TOOLONGKEY", EclData::Mess).is_err());
    }

    #[test]
    fn accessor_kind_mismatch() {
        let r = EclRecord::new("DIMENS", EclData::Inte(vec![1, 2, 3])).unwrap();
        assert!(r.inte().is_ok());
        let err = r.real().unwrap_err();
        assert!(matches!(err, EclError::KindMismatch { .. }));
    }
}

//! Binary header (SMSPEC) serialization.
//!
//! The header is a fixed sequence of keyword records; see the crate docs
//! for the registry semantics. Five records are mandatory on read
//! (KEYWORDS, WGNAMES/NAMES, UNITS, DIMENS, STARTDAT); everything else is
//! optional with documented defaults.

use crate::error::{SmspecError, SmspecResult};
use crate::node::{DUMMY_WELL, LgrLocation, SmspecVarKind, classify};
use crate::registry::{GridDims, SmspecRegistry, UnitSystem};
use chrono::{Datelike, NaiveDate};
use en_ecl::{EclData, EclRecord, STRING_WIDTH, find, read_records, write_records};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

const KW_INTEHEAD: &str = "INTEHEAD";
const KW_RESTART: &str = "RESTART";
const KW_DIMENS: &str = "DIMENS";
const KW_KEYWORDS: &str = "KEYWORDS";
const KW_WGNAMES: &str = "WGNAMES";
const KW_NAMES: &str = "NAMES";
const KW_NUMS: &str = "NUMS";
const KW_UNITS: &str = "UNITS";
const KW_STARTDAT: &str = "STARTDAT";
const KW_LGRS: &str = "LGRS";
const KW_NUMLX: &str = "NUMLX";
const KW_NUMLY: &str = "NUMLY";
const KW_NUMLZ: &str = "NUMLZ";

/// Number of 8-character chunks in the RESTART record.
const RESTART_CHUNKS: usize = 8;

fn truncate8(s: &str) -> String {
    s.chars().take(STRING_WIDTH).collect()
}

/// Serialize the registry to a header file at `path`.
pub fn write_header(registry: &SmspecRegistry, path: &Path) -> SmspecResult<()> {
    let n = registry.node_count();
    let dims = registry.dims();

    let mut records = Vec::new();

    records.push(EclRecord::new(
        KW_INTEHEAD,
        EclData::Inte(vec![registry.unit_system().code(), registry.simulator()]),
    )?);

    records.push(EclRecord::new(
        KW_RESTART,
        EclData::Char(restart_chunks(registry.restart_case())),
    )?);

    records.push(EclRecord::new(
        KW_DIMENS,
        EclData::Inte(vec![
            n as i32,
            dims.nx,
            dims.ny,
            dims.nz,
            0,
            registry.restart_step(),
        ]),
    )?);

    let keywords: Vec<String> = registry.nodes().map(|node| truncate8(node.keyword())).collect();
    records.push(EclRecord::new(KW_KEYWORDS, EclData::Char(keywords))?);

    // entity names: 8-char WGNAMES if everything fits, wider NAMES otherwise
    let names: Vec<String> = registry
        .nodes()
        .map(|node| node.wgname().unwrap_or(DUMMY_WELL).to_string())
        .collect();
    let max_name = names.iter().map(String::len).max().unwrap_or(0);
    if max_name <= STRING_WIDTH {
        records.push(EclRecord::new(KW_WGNAMES, EclData::Char(names))?);
    } else {
        records.push(EclRecord::new(KW_NAMES, EclData::CharN(max_name, names))?);
    }

    // NUMS only when some node actually carries an auxiliary number
    if registry.nodes().any(|node| node.num().is_some()) {
        let nums: Vec<i32> = registry.nodes().map(|node| node.num().unwrap_or(0)).collect();
        records.push(EclRecord::new(KW_NUMS, EclData::Inte(nums))?);
    }

    let units: Vec<String> = registry.nodes().map(|node| truncate8(node.unit())).collect();
    records.push(EclRecord::new(KW_UNITS, EclData::Char(units))?);

    let date = registry.start_date();
    records.push(EclRecord::new(
        KW_STARTDAT,
        EclData::Inte(vec![date.day() as i32, date.month() as i32, date.year()]),
    )?);

    if registry.nodes().any(|node| node.lgr().is_some()) {
        let lgr_names: Vec<String> = registry
            .nodes()
            .map(|node| node.lgr().map(|l| l.name.clone()).unwrap_or_default())
            .collect();
        records.push(EclRecord::new(KW_LGRS, EclData::Char(lgr_names))?);

        let coord = |pick: fn(&LgrLocation) -> i32| -> Vec<i32> {
            registry
                .nodes()
                .map(|node| node.lgr().map(pick).unwrap_or(0))
                .collect()
        };
        records.push(EclRecord::new(KW_NUMLX, EclData::Inte(coord(|l| l.i)))?);
        records.push(EclRecord::new(KW_NUMLY, EclData::Inte(coord(|l| l.j)))?);
        records.push(EclRecord::new(KW_NUMLZ, EclData::Inte(coord(|l| l.k)))?);
    }

    write_records(path, &records)?;
    Ok(())
}

fn restart_chunks(case: Option<&str>) -> Vec<String> {
    let case = case.unwrap_or_default();
    if case.len() > RESTART_CHUNKS * STRING_WIDTH {
        warn!(case, "restart case name too long for RESTART record, truncating");
    }
    (0..RESTART_CHUNKS)
        .map(|i| {
            case.chars()
                .skip(i * STRING_WIDTH)
                .take(STRING_WIDTH)
                .collect()
        })
        .collect()
}

/// Parse a header file back into a registry.
///
/// Rows the classifier cannot place are kept as blank column reservations
/// so that column positions stay aligned with the data files, but they get
/// no lookup entries.
pub fn read_header(path: &Path) -> SmspecResult<SmspecRegistry> {
    let records = read_records(path)?;

    let keywords = mandatory(&records, KW_KEYWORDS)?.chars()?.to_vec();
    let names = match find(&records, KW_WGNAMES).or_else(|| find(&records, KW_NAMES)) {
        Some(record) => record.chars()?.to_vec(),
        None => return Err(SmspecError::MissingKeyword { keyword: KW_WGNAMES }),
    };
    let units = mandatory(&records, KW_UNITS)?.chars()?.to_vec();
    let dimens = mandatory(&records, KW_DIMENS)?.inte()?.to_vec();
    let startdat = mandatory(&records, KW_STARTDAT)?.inte()?.to_vec();

    if dimens.len() < 4 {
        return Err(SmspecError::InvalidDimens);
    }
    let n = dimens[0].max(0) as usize;
    let dims = GridDims::new(dimens[1], dimens[2], dimens[3]);
    // block/completion keys divide by the layer size; a degenerate grid
    // means the header is corrupt
    if dims.nx <= 0 || dims.ny <= 0 || dims.nz <= 0 {
        return Err(SmspecError::InvalidDimens);
    }
    let restart_step = dimens.get(5).copied().unwrap_or(-1);

    if startdat.len() < 3 {
        return Err(SmspecError::InvalidDate {
            day: 0,
            month: 0,
            year: 0,
        });
    }
    let (day, month, year) = (startdat[0], startdat[1], startdat[2]);
    let start_date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .ok_or(SmspecError::InvalidDate { day, month, year })?;

    check_len(KW_KEYWORDS, &keywords, n)?;
    check_len("WGNAMES/NAMES", &names, n)?;
    check_len(KW_UNITS, &units, n)?;

    let mut registry = SmspecRegistry::new(dims, start_date);

    match find(&records, KW_INTEHEAD) {
        Some(record) => {
            let head = record.inte()?;
            let code = head.first().copied().unwrap_or(0);
            match UnitSystem::from_code(code) {
                Some(unit_system) => registry.set_unit_system(unit_system),
                None => {
                    warn!(code, "unknown unit system code in INTEHEAD, assuming METRIC");
                    registry.set_unit_system(UnitSystem::Metric);
                }
            }
            if let Some(&simulator) = head.get(1) {
                registry.set_simulator(simulator);
            }
        }
        None => {
            // backward-compatibility default: correctness depends on the
            // provenance of the file, so make the assumption visible
            warn!(
                header = %path.display(),
                "header has no INTEHEAD record, assuming METRIC units"
            );
            registry.set_unit_system(UnitSystem::Metric);
        }
    }

    let nums = match find(&records, KW_NUMS) {
        Some(record) => {
            let v = record.inte()?.to_vec();
            check_len(KW_NUMS, &v, n)?;
            Some(v)
        }
        None => None,
    };

    let lgr_arrays = match find(&records, KW_LGRS) {
        Some(lgrs) => {
            let lgrs = lgrs.chars()?.to_vec();
            let numlx = mandatory(&records, KW_NUMLX)?.inte()?.to_vec();
            let numly = mandatory(&records, KW_NUMLY)?.inte()?.to_vec();
            let numlz = mandatory(&records, KW_NUMLZ)?.inte()?.to_vec();
            check_len(KW_LGRS, &lgrs, n)?;
            check_len(KW_NUMLX, &numlx, n)?;
            check_len(KW_NUMLY, &numly, n)?;
            check_len(KW_NUMLZ, &numlz, n)?;
            Some((lgrs, numlx, numly, numlz))
        }
        None => None,
    };

    for row in 0..n {
        let keyword = keywords[row].as_str();
        let name = names[row].as_str();
        let wgname = if name.is_empty() || name == DUMMY_WELL {
            None
        } else {
            Some(name)
        };
        let num = nums
            .as_ref()
            .map(|v| v[row])
            .filter(|&v| v != 0);
        let unit = units[row].as_str();

        let lgr = lgr_arrays.as_ref().and_then(|(lgrs, lx, ly, lz)| {
            let lgr_name = lgrs[row].as_str();
            if lgr_name.is_empty() {
                None
            } else {
                Some(LgrLocation {
                    name: lgr_name.to_string(),
                    i: lx[row],
                    j: ly[row],
                    k: lz[row],
                })
            }
        });

        let kind = classify(keyword, wgname, num);
        match kind {
            SmspecVarKind::Skip => {
                debug!(keyword, row, "unclassifiable header row, reserving blank column");
                registry.add_blank_node();
            }
            SmspecVarKind::LocalWell
            | SmspecVarKind::LocalBlock
            | SmspecVarKind::LocalCompletion => match lgr {
                Some(lgr) => {
                    registry.insert(kind, keyword, wgname, num, unit, 0.0, Some(lgr));
                }
                None => {
                    debug!(keyword, row, "local variable without LGR arrays, skipping");
                    registry.add_blank_node();
                }
            },
            _ => {
                registry.insert(kind, keyword, wgname, num, unit, 0.0, None);
            }
        }
    }

    if let Some(case) = read_restart_case(&records)? {
        let resolved = resolve_restart_path(path, &case);
        registry.set_restart_case(&resolved, restart_step);
    }

    Ok(registry)
}

fn mandatory<'a>(records: &'a [EclRecord], keyword: &'static str) -> SmspecResult<&'a EclRecord> {
    find(records, keyword).ok_or(SmspecError::MissingKeyword { keyword })
}

fn check_len<T>(what: &'static str, v: &[T], expected: usize) -> SmspecResult<()> {
    if v.len() != expected {
        return Err(SmspecError::WrongLength {
            what,
            expected,
            found: v.len(),
        });
    }
    Ok(())
}

fn read_restart_case(records: &[EclRecord]) -> SmspecResult<Option<String>> {
    let Some(record) = find(records, KW_RESTART) else {
        return Ok(None);
    };
    let joined: String = record.chars()?.concat();
    let joined = joined.trim().to_string();
    if joined.is_empty() {
        Ok(None)
    } else {
        Ok(Some(joined))
    }
}

/// Resolve a restart case name (possibly relative, possibly with foreign
/// path separators) to an absolute path next to the header.
fn resolve_restart_path(header: &Path, case: &str) -> String {
    let case = case.replace('\\', "/");
    let case_path = Path::new(&case);
    if case_path.is_absolute() {
        return normalize(case_path).to_string_lossy().into_owned();
    }
    let dir = header.parent().unwrap_or_else(|| Path::new("."));
    normalize(&dir.join(case_path)).to_string_lossy().into_owned()
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_chunking_round_trips() {
        let chunks = restart_chunks(Some("../BASE/PRIOR_CASE"));
        assert_eq!(chunks.len(), RESTART_CHUNKS);
        assert_eq!(chunks[0], "../BASE/");
        assert_eq!(chunks.concat().trim_end(), "../BASE/PRIOR_CASE");
    }

    #[test]
    fn restart_path_resolution_translates_separators() {
        let resolved = resolve_restart_path(
            Path::new("/work/ens/run0/CASE.SMSPEC"),
            "..\\prior\\PRIOR",
        );
        assert_eq!(resolved, "/work/ens/prior/PRIOR");
    }
}

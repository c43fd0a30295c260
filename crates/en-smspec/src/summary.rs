//! Summary data files: per-ministep flat vectors addressed through the
//! registry's column positions.
//!
//! Data lives either in one unified file (`CASE.UNSMRY`) or in sequential
//! per-step files (`CASE.S0001`, `CASE.S0002`, ...). The unified layout is a
//! repetition of SEQHDR (report-step boundary) followed by MINISTEP/PARAMS
//! pairs; a per-step file holds the records of exactly one report step.

use crate::error::{SmspecError, SmspecResult};
use crate::registry::SmspecRegistry;
use en_core::ReportStep;
use en_ecl::{EclData, EclFileKind, EclRecord, ecl_filename, read_records, write_records};
use std::path::{Path, PathBuf};
use tracing::debug;

const KW_SEQHDR: &str = "SEQHDR";
const KW_MINISTEP: &str = "MINISTEP";
const KW_PARAMS: &str = "PARAMS";

/// One simulator ministep: a full flat vector of variable values.
#[derive(Clone, Debug, PartialEq)]
pub struct MiniStep {
    pub report_step: ReportStep,
    pub ministep: i32,
    pub params: Vec<f32>,
}

/// Loaded summary data for one case.
#[derive(Clone, Debug)]
pub struct SummaryData {
    ministeps: Vec<MiniStep>,
}

impl SummaryData {
    /// Load summary data for `case` (path without extension).
    ///
    /// Prefers the unified file; otherwise probes sequential per-step files
    /// starting at `load_start`. A missing per-step file is not an error by
    /// itself, it just ends the sequence; finding no data at all is.
    pub fn load(
        case: &Path,
        load_start: ReportStep,
        formatted: bool,
    ) -> SmspecResult<SummaryData> {
        let unified = case_file(case, EclFileKind::UnifiedSummary, formatted)?;
        if unified.exists() {
            return Self::load_unified(&unified);
        }
        Self::load_step_files(case, load_start, formatted)
    }

    fn load_unified(path: &Path) -> SmspecResult<SummaryData> {
        let records = read_records(path)?;
        let mut ministeps = Vec::new();
        let mut report_step: ReportStep = 0;
        let mut pending_ministep: Option<i32> = None;

        for record in &records {
            match record.keyword() {
                KW_SEQHDR => report_step += 1,
                KW_MINISTEP => pending_ministep = record.inte()?.first().copied(),
                KW_PARAMS => {
                    let params = record.real()?.to_vec();
                    ministeps.push(MiniStep {
                        report_step,
                        ministep: pending_ministep.take().unwrap_or(ministeps.len() as i32),
                        params,
                    });
                }
                other => debug!(keyword = other, "ignoring summary record"),
            }
        }

        if ministeps.is_empty() {
            return Err(SmspecError::NoSummaryData {
                case: path.display().to_string(),
            });
        }
        Ok(SummaryData { ministeps })
    }

    fn load_step_files(
        case: &Path,
        load_start: ReportStep,
        formatted: bool,
    ) -> SmspecResult<SummaryData> {
        let mut ministeps = Vec::new();
        let mut step = load_start.max(1);
        loop {
            let path = case_file(case, EclFileKind::SummaryStep(step), formatted)?;
            if !path.exists() {
                // first missing step bounds the effective last report
                break;
            }
            let records = read_records(&path)?;
            let mut pending_ministep: Option<i32> = None;
            for record in &records {
                match record.keyword() {
                    KW_SEQHDR => {}
                    KW_MINISTEP => pending_ministep = record.inte()?.first().copied(),
                    KW_PARAMS => ministeps.push(MiniStep {
                        report_step: step,
                        ministep: pending_ministep.take().unwrap_or(ministeps.len() as i32),
                        params: record.real()?.to_vec(),
                    }),
                    other => debug!(keyword = other, "ignoring summary record"),
                }
            }
            step += 1;
        }

        if ministeps.is_empty() {
            return Err(SmspecError::NoSummaryData {
                case: case.display().to_string(),
            });
        }
        Ok(SummaryData { ministeps })
    }

    pub fn ministeps(&self) -> &[MiniStep] {
        &self.ministeps
    }

    pub fn first_report_step(&self) -> ReportStep {
        self.ministeps.first().map(|m| m.report_step).unwrap_or(0)
    }

    pub fn last_report_step(&self) -> ReportStep {
        self.ministeps.last().map(|m| m.report_step).unwrap_or(0)
    }

    /// All values of one column, in ministep order.
    pub fn values(&self, params_index: usize) -> SmspecResult<Vec<f32>> {
        self.ministeps
            .iter()
            .map(|m| {
                m.params.get(params_index).copied().ok_or_else(|| {
                    SmspecError::WrongLength {
                        what: "PARAMS",
                        expected: params_index + 1,
                        found: m.params.len(),
                    }
                })
            })
            .collect()
    }

    /// All values of the variable with the given general key.
    pub fn column(&self, registry: &SmspecRegistry, gen_key: &str) -> SmspecResult<Vec<f32>> {
        let node = registry.general_var(gen_key)?;
        self.values(node.params_index())
    }

    /// Value at the last ministep of `report_step`, if that step exists.
    pub fn report_value(&self, params_index: usize, report_step: ReportStep) -> Option<f32> {
        self.ministeps
            .iter()
            .rev()
            .find(|m| m.report_step == report_step)
            .and_then(|m| m.params.get(params_index).copied())
    }

    /// Distinct report steps, ascending.
    pub fn report_steps(&self) -> Vec<ReportStep> {
        let mut steps: Vec<ReportStep> = self.ministeps.iter().map(|m| m.report_step).collect();
        steps.sort_unstable();
        steps.dedup();
        steps
    }

    /// Simulation time (days) at the end of the loaded data, if the case
    /// declares a TIME variable.
    pub fn sim_time_end(&self, registry: &SmspecRegistry) -> Option<f64> {
        let node = registry.misc_var("TIME").ok()?;
        self.ministeps
            .last()
            .and_then(|m| m.params.get(node.params_index()).copied())
            .map(f64::from)
    }
}

/// Accumulates ministeps and writes them out in either file layout.
pub struct SummaryWriter<'a> {
    registry: &'a SmspecRegistry,
    ministeps: Vec<MiniStep>,
}

impl<'a> SummaryWriter<'a> {
    pub fn new(registry: &'a SmspecRegistry) -> Self {
        Self {
            registry,
            ministeps: Vec::new(),
        }
    }

    /// Append one ministep. The vector must be exactly `params_size` wide.
    pub fn add_ministep(&mut self, report_step: ReportStep, params: Vec<f32>) -> SmspecResult<()> {
        if params.len() != self.registry.params_size() {
            return Err(SmspecError::WrongLength {
                what: "PARAMS",
                expected: self.registry.params_size(),
                found: params.len(),
            });
        }
        let ministep = self.ministeps.len() as i32;
        self.ministeps.push(MiniStep {
            report_step,
            ministep,
            params,
        });
        Ok(())
    }

    pub fn write_unified(&self, path: &Path) -> SmspecResult<()> {
        let mut records = Vec::new();
        let mut current_report = None;
        for m in &self.ministeps {
            if current_report != Some(m.report_step) {
                records.push(EclRecord::new(KW_SEQHDR, EclData::Inte(vec![0]))?);
                current_report = Some(m.report_step);
            }
            push_ministep(&mut records, m)?;
        }
        write_records(path, &records)?;
        Ok(())
    }

    /// Write one `S{nnnn}` file per report step next to `case`.
    pub fn write_step_files(&self, case: &Path, formatted: bool) -> SmspecResult<()> {
        let mut steps = self.ministeps.iter().map(|m| m.report_step).collect::<Vec<_>>();
        steps.sort_unstable();
        steps.dedup();

        for step in steps {
            let mut records = vec![EclRecord::new(KW_SEQHDR, EclData::Inte(vec![0]))?];
            for m in self.ministeps.iter().filter(|m| m.report_step == step) {
                push_ministep(&mut records, m)?;
            }
            let path = case_file(case, EclFileKind::SummaryStep(step), formatted)?;
            write_records(&path, &records)?;
        }
        Ok(())
    }
}

fn push_ministep(records: &mut Vec<EclRecord>, m: &MiniStep) -> SmspecResult<()> {
    records.push(EclRecord::new(KW_MINISTEP, EclData::Inte(vec![m.ministep]))?);
    records.push(EclRecord::new(KW_PARAMS, EclData::Real(m.params.clone()))?);
    Ok(())
}

/// Path of the file with the given role next to `case`.
pub fn case_file(case: &Path, kind: EclFileKind, formatted: bool) -> SmspecResult<PathBuf> {
    let base = case
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| SmspecError::NoSummaryData {
            case: case.display().to_string(),
        })?;
    let dir = case.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(ecl_filename(&base, kind, formatted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GridDims, SmspecRegistry};
    use chrono::NaiveDate;

    fn registry() -> SmspecRegistry {
        let mut reg = SmspecRegistry::new(
            GridDims::new(10, 10, 5),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        );
        reg.add_node("TIME", None, None, "DAYS", 0.0).unwrap();
        reg.add_node("FOPR", None, None, "SM3/DAY", 0.0).unwrap();
        reg.add_node("WOPR", Some("P1"), None, "SM3/DAY", 0.0).unwrap();
        reg
    }

    #[test]
    fn writer_rejects_wrong_width() {
        let reg = registry();
        let mut writer = SummaryWriter::new(&reg);
        let err = writer.add_ministep(1, vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, SmspecError::WrongLength { .. }));
    }

    #[test]
    fn report_value_takes_last_ministep() {
        let reg = registry();
        let mut writer = SummaryWriter::new(&reg);
        writer.add_ministep(1, vec![1.0, 10.0, 100.0]).unwrap();
        writer.add_ministep(1, vec![2.0, 20.0, 200.0]).unwrap();
        writer.add_ministep(2, vec![3.0, 30.0, 300.0]).unwrap();

        let data = SummaryData {
            ministeps: writer.ministeps.clone(),
        };
        assert_eq!(data.report_value(1, 1), Some(20.0));
        assert_eq!(data.report_value(1, 2), Some(30.0));
        assert_eq!(data.report_steps(), vec![1, 2]);
        assert_eq!(data.sim_time_end(&reg), Some(3.0));
    }
}

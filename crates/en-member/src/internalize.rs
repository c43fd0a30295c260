//! Result internalization: read simulator output back into member nodes.
//!
//! Loading degrades feature-by-feature rather than all-or-nothing: one bad
//! summary vector flips `load_ok` and is logged, but every other node still
//! gets its data. The one exception is a summary that ends before the
//! configured end time, which means the simulator died partway; the whole
//! attempt is then treated as a failure.

use crate::nodes::{EnsembleNode, NodeHash, VarKind};
use crate::MemberResult;
use en_config::EclConfig;
use en_core::{ReportStep, StateKind};
use en_ecl::{EclFileKind, EclRecord, read_records};
use en_smspec::{SummaryData, case_file, read_header};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of one internalization attempt.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub load_ok: bool,
    pub loaded_nodes: Vec<String>,
    pub failed_nodes: Vec<String>,
    pub last_report_step: ReportStep,
    /// Every non-dynamic keyword seen per report step, occurrence-tagged.
    /// Needed to reconstruct an output restart file without guessing.
    pub static_kw_per_step: BTreeMap<ReportStep, Vec<String>>,
}

/// Read summary and restart output for one finished run into `nodes`.
pub fn load_results(
    nodes: &mut NodeHash,
    iens: u32,
    run_path: &Path,
    eclbase: &str,
    ecl: &EclConfig,
    load_start: ReportStep,
) -> MemberResult<LoadReport> {
    let case = run_path.join(eclbase);
    let registry = read_header(&case_file(&case, EclFileKind::Smspec, ecl.formatted)?)?;
    let summary = SummaryData::load(&case, load_start, ecl.formatted)?;

    let mut report = LoadReport {
        load_ok: true,
        last_report_step: summary.last_report_step(),
        ..LoadReport::default()
    };

    if let Some(expected_end) = ecl.end_time_days {
        let actual_end = summary.sim_time_end(&registry).unwrap_or(0.0);
        if actual_end < expected_end {
            warn!(
                iens,
                actual_end, expected_end, "summary ends early, discarding whole attempt"
            );
            report.load_ok = false;
            return Ok(report);
        }
    }

    let steps: Vec<ReportStep> = summary
        .report_steps()
        .into_iter()
        .filter(|step| *step >= load_start)
        .collect();

    for key in nodes.keys_of_kind(VarKind::DynamicResult) {
        let column = registry
            .general_var(&key)
            .map(|node| node.params_index())
            .and_then(|ix| summary.values(ix).map(|_| ix));
        match column {
            Ok(ix) => {
                let node = nodes.get_node_mut(&key)?;
                for step in &steps {
                    if let Some(value) = summary.report_value(ix, *step) {
                        node.store(*step, StateKind::Forecast, vec![f64::from(value)]);
                    }
                }
                report.loaded_nodes.push(key);
            }
            Err(err) => {
                warn!(iens, key = key.as_str(), %err, "failed to load summary vector");
                report.load_ok = false;
                report.failed_nodes.push(key);
            }
        }
    }

    load_restart_steps(nodes, iens, &case, ecl, &steps, &mut report)?;
    Ok(report)
}

/// One pass over the per-step restart snapshots. Dynamic state is stored
/// under (report_step, Forecast). Every other keyword is occurrence-tagged
/// and recorded so a restart file can be reconstructed in original order;
/// the `static_kw` list selects which of those payloads are retained as
/// static-state nodes (numeric payloads only).
fn load_restart_steps(
    nodes: &mut NodeHash,
    iens: u32,
    case: &Path,
    ecl: &EclConfig,
    steps: &[ReportStep],
    report: &mut LoadReport,
) -> MemberResult<()> {
    for step in steps {
        let path = case_file(case, EclFileKind::RestartStep(*step), ecl.formatted)?;
        if !path.exists() {
            continue;
        }
        let records = match read_records(&path) {
            Ok(records) => records,
            Err(err) => {
                warn!(iens, step, %err, "unreadable restart snapshot");
                report.load_ok = false;
                continue;
            }
        };

        let mut occurrence: BTreeMap<String, u32> = BTreeMap::new();
        for record in &records {
            let keyword = record.keyword().trim().to_string();
            let seen = occurrence.entry(keyword.clone()).or_insert(0);
            let tagged = if *seen == 0 {
                keyword.clone()
            } else {
                format!("{}_{}", keyword, seen)
            };
            *seen += 1;

            let is_dynamic = nodes
                .get_node(&keyword)
                .map(|node| node.kind() == VarKind::DynamicState)
                .unwrap_or(false);
            if is_dynamic {
                if let Some(values) = numeric_values(record) {
                    nodes
                        .get_node_mut(&keyword)?
                        .store(*step, StateKind::Forecast, values);
                } else {
                    warn!(iens, step, keyword = keyword.as_str(), "dynamic state record is not numeric");
                    report.load_ok = false;
                }
            } else {
                report
                    .static_kw_per_step
                    .entry(*step)
                    .or_default()
                    .push(tagged.clone());
                if ecl.static_kw.iter().any(|kw| kw == &keyword) {
                    if let Some(values) = numeric_values(record) {
                        debug!(iens, step, keyword = tagged.as_str(), "static payload retained");
                        if !nodes.has_key(&tagged) {
                            nodes.add_node(EnsembleNode::new(
                                tagged.as_str(),
                                VarKind::StaticState,
                            ));
                        }
                        nodes.get_node_mut(&tagged)?.store(*step, StateKind::Forecast, values);
                    }
                }
            }
        }
    }
    Ok(())
}

fn numeric_values(record: &EclRecord) -> Option<Vec<f64>> {
    if let Ok(values) = record.doub() {
        return Some(values.to_vec());
    }
    if let Ok(values) = record.real() {
        return Some(values.iter().copied().map(f64::from).collect());
    }
    None
}

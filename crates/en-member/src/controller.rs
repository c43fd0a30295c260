//! One run controller per ensemble member.
//!
//! The controller drives the member's state machine:
//! `NotStarted → Running → {RunOk | RunFailure | LoadFailure}`, with an
//! internal-retry transition back to `Running` (same queue slot, freshly
//! rewritten run directory) while `num_internal_submit` is below the bound.

use crate::internalize::load_results;
use crate::nodes::{EnsembleNode, NodeHash, ParamSpec, VarKind};
use crate::run_info::{RunInfo, RunInit, RunMode, RunPathState, RunStatus};
use crate::shared::SharedInfo;
use crate::{MemberError, MemberResult};
use en_config::{RunpathRetention, Substituter, tokens};
use en_ecl::{EclData, EclFileKind, EclRecord, ecl_filename, write_records};
use en_queue::{JobSpec, QueueIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct MemberController {
    iens: u32,
    shared: Arc<SharedInfo>,
    nodes: NodeHash,
    rng: StdRng,
    subst: Substituter,
    run_info: Option<RunInfo>,
    eclbase: String,
    /// Per-member override of the run-directory retention policy.
    keep_runpath: Option<bool>,
}

impl MemberController {
    /// The member's random stream is seeded once from the shared master
    /// stream here and never reseeded, so resampling on retry stays
    /// reproducible per member.
    pub fn new(iens: u32, shared: Arc<SharedInfo>, master_rng: &mut StdRng) -> Self {
        let rng = StdRng::seed_from_u64(master_rng.r#gen());

        let mut nodes = NodeHash::new();
        for param in &shared.config().parameters {
            nodes.add_node(EnsembleNode::parameter(
                &param.name,
                ParamSpec {
                    low: param.low,
                    high: param.high,
                },
            ));
        }

        let mut subst = shared.base_subst().clone();
        subst.set_member_index(iens);

        Self {
            iens,
            shared,
            nodes,
            rng,
            subst,
            run_info: None,
            eclbase: String::new(),
            keep_runpath: None,
        }
    }

    pub fn iens(&self) -> u32 {
        self.iens
    }

    pub fn set_keep_runpath(&mut self, keep: Option<bool>) {
        self.keep_runpath = keep;
    }

    pub fn add_node(&mut self, node: EnsembleNode) {
        self.nodes.add_node(node);
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.nodes.has_key(key)
    }

    pub fn get_node(&self, key: &str) -> MemberResult<&EnsembleNode> {
        self.nodes.get_node(key)
    }

    pub fn nodes(&self) -> &NodeHash {
        &self.nodes
    }

    /// Populate run bookkeeping for one simulation attempt and resolve the
    /// member's absolute run path through the substitution engine.
    pub fn init_run(&mut self, init: RunInit) -> MemberResult<()> {
        let config = self.shared.config_handle();
        let mut run_info = RunInfo::new(&init, config.model.max_internal_submit)?;

        self.subst.set_step_window(init.step1, init.step2);

        let eclbase = self.subst.filter(&config.ecl.eclbase, &mut self.rng);
        self.subst.set(tokens::ECLBASE, eclbase.clone());
        self.subst.set(tokens::ECL_BASE, eclbase.clone());
        self.subst.set(
            tokens::SMSPEC,
            ecl_filename(&eclbase, EclFileKind::Smspec, config.ecl.formatted),
        );
        self.subst.set(
            tokens::RESTART_FILE1,
            ecl_filename(
                &eclbase,
                EclFileKind::RestartStep(init.step1),
                config.ecl.formatted,
            ),
        );
        self.subst.set(
            tokens::RESTART_FILE2,
            ecl_filename(
                &eclbase,
                EclFileKind::RestartStep(init.step2),
                config.ecl.formatted,
            ),
        );
        self.subst.set(
            tokens::INIT,
            ecl_filename(&eclbase, EclFileKind::Init, config.ecl.formatted),
        );

        let raw_path = self.subst.filter(&config.model.runpath, &mut self.rng);
        let run_path = std::path::absolute(PathBuf::from(raw_path))?;
        self.subst
            .set(tokens::RUNPATH, run_path.display().to_string());

        run_info.run_path = RunPathState::InFlight(run_path);
        self.eclbase = eclbase;
        self.run_info = Some(run_info);
        Ok(())
    }

    /// Prepare the run directory and submit the forward model. A no-op for
    /// inactive members.
    pub fn start_forward_model(&mut self) -> MemberResult<()> {
        let run_info = self.run_info.as_ref().ok_or(MemberError::NotInitialized)?;
        if !run_info.active {
            info!(iens = self.iens, "member inactive, forward model not started");
            return Ok(());
        }
        let run_path = run_info
            .run_path
            .path()
            .ok_or(MemberError::NotInitialized)?
            .to_path_buf();

        let pre_clear = self.shared.config().model.pre_clear_runpath;
        self.prepare_run_dir(&run_path, false, pre_clear)?;

        let spec = self.job_spec(&run_path);
        let queue_index = self.shared.queue().submit(spec)?;

        if let Some(run_info) = self.run_info.as_mut() {
            run_info.queue_index = Some(queue_index);
            run_info.num_internal_submit += 1;
            run_info.run_status = RunStatus::Running;
        }
        info!(iens = self.iens, queue_index, "forward model submitted");
        Ok(())
    }

    /// React to a clean simulator exit: internalize results. Returns whether
    /// the load succeeded; a failed load is routed into the retry path.
    pub fn on_job_ok(&mut self) -> MemberResult<bool> {
        let run_info = self.run_info.as_ref().ok_or(MemberError::NotInitialized)?;
        let run_path = run_info
            .run_path
            .path()
            .ok_or(MemberError::NotInitialized)?
            .to_path_buf();
        let (mode, load_start) = (run_info.mode, run_info.load_start);

        let config = self.shared.config_handle();
        let eclbase = self.eclbase.clone();
        let loaded = load_results(
            &mut self.nodes,
            self.iens,
            &run_path,
            &eclbase,
            &config.ecl,
            load_start,
        );

        match loaded {
            Ok(report) if report.load_ok => {
                if self.should_delete_runpath(mode) {
                    if let Err(err) = fs::remove_dir_all(&run_path) {
                        warn!(iens = self.iens, %err, "failed to delete run directory");
                    }
                }
                if let Some(run_info) = self.run_info.as_mut() {
                    run_info.run_status = RunStatus::RunOk;
                    run_info.run_path = RunPathState::Cleared;
                }
                info!(
                    iens = self.iens,
                    loaded = report.loaded_nodes.len(),
                    last_report_step = report.last_report_step,
                    "results internalized"
                );
                Ok(true)
            }
            Ok(report) => {
                warn!(
                    iens = self.iens,
                    failed = ?report.failed_nodes,
                    "internalization incomplete"
                );
                self.retry_or_terminal(RunStatus::LoadFailure)?;
                Ok(false)
            }
            Err(err) => {
                warn!(iens = self.iens, %err, "internalization failed");
                self.retry_or_terminal(RunStatus::LoadFailure)?;
                Ok(false)
            }
        }
    }

    /// React to a failed simulator run (nonzero exit, killed).
    pub fn on_job_exit(&mut self) -> MemberResult<()> {
        warn!(iens = self.iens, "forward model exited abnormally");
        self.retry_or_terminal(RunStatus::RunFailure)
    }

    /// Forwarded to the queue; succeeds only while the job is killable.
    /// Run bookkeeping is updated by the subsequent completion event, not
    /// here.
    pub fn kill_simulation(&self) -> MemberResult<()> {
        let queue_index = self.queue_index().ok_or(MemberError::NotSubmitted)?;
        self.shared.queue().kill(queue_index)?;
        Ok(())
    }

    /// Operator-triggered twin of the internal retry path.
    pub fn resubmit_simulation(&mut self, resample: bool) -> MemberResult<()> {
        let queue_index = self.queue_index().ok_or(MemberError::NotSubmitted)?;
        if !self.shared.queue().restartable(queue_index) {
            let status = self.shared.queue().status(queue_index)?;
            return Err(MemberError::Queue(en_queue::QueueError::NotRestartable {
                status,
            }));
        }
        self.internal_retry(resample)
    }

    pub fn run_path(&self) -> Option<&Path> {
        self.run_info.as_ref().and_then(|info| info.run_path.path())
    }

    pub fn run_path_state(&self) -> RunPathState {
        self.run_info
            .as_ref()
            .map(|info| info.run_path.clone())
            .unwrap_or(RunPathState::Unset)
    }

    pub fn simple_run_status(&self) -> RunStatus {
        self.run_info
            .as_ref()
            .map(|info| info.run_status)
            .unwrap_or(RunStatus::NotStarted)
    }

    pub fn queue_index(&self) -> Option<QueueIndex> {
        self.run_info.as_ref().and_then(|info| info.queue_index)
    }

    pub fn num_internal_submit(&self) -> u32 {
        self.run_info
            .as_ref()
            .map(|info| info.num_internal_submit)
            .unwrap_or(0)
    }

    pub fn eclbase(&self) -> &str {
        &self.eclbase
    }

    fn retry_or_terminal(&mut self, pending: RunStatus) -> MemberResult<()> {
        let run_info = self.run_info.as_ref().ok_or(MemberError::NotInitialized)?;
        if run_info.num_internal_submit < run_info.max_internal_submit {
            return self.internal_retry(true);
        }

        let (step1, step2) = (run_info.step1, run_info.step2);
        if let Some(run_info) = self.run_info.as_mut() {
            // keep the more specific load failure over a generic run failure
            run_info.run_status = if run_info.run_status == RunStatus::LoadFailure
                || pending == RunStatus::LoadFailure
            {
                RunStatus::LoadFailure
            } else {
                RunStatus::RunFailure
            };
            run_info.run_path = match std::mem::take(&mut run_info.run_path) {
                RunPathState::InFlight(path) | RunPathState::Retained(path) => {
                    RunPathState::Retained(path)
                }
                other => other,
            };
        }
        warn!(
            iens = self.iens,
            step1,
            step2,
            status = ?self.simple_run_status(),
            "realization failed, run directory retained for inspection"
        );
        Ok(())
    }

    /// Resample, rewrite the run directory from scratch and re-arm the
    /// existing queue slot. No new queue entry is created.
    fn internal_retry(&mut self, resample: bool) -> MemberResult<()> {
        let run_info = self.run_info.as_ref().ok_or(MemberError::NotInitialized)?;
        let queue_index = run_info.queue_index.ok_or(MemberError::NotSubmitted)?;
        let run_path = run_info
            .run_path
            .path()
            .ok_or(MemberError::NotInitialized)?
            .to_path_buf();
        info!(
            iens = self.iens,
            queue_index,
            attempt = run_info.num_internal_submit + 1,
            "retrying forward model"
        );

        self.prepare_run_dir(&run_path, resample, true)?;
        let spec = self.job_spec(&run_path);
        self.shared
            .queue()
            .set_external_restart(queue_index, Some(spec))?;

        if let Some(run_info) = self.run_info.as_mut() {
            run_info.num_internal_submit += 1;
            run_info.run_status = RunStatus::Running;
            run_info.run_path = match std::mem::take(&mut run_info.run_path) {
                RunPathState::InFlight(path) | RunPathState::Retained(path) => {
                    RunPathState::InFlight(path)
                }
                other => other,
            };
        }
        Ok(())
    }

    /// Write every input the forward model needs into the run directory:
    /// sampled parameter includes, the dynamic-state seed snapshot and the
    /// instantiated text templates.
    fn prepare_run_dir(
        &mut self,
        run_path: &Path,
        resample: bool,
        clear: bool,
    ) -> MemberResult<()> {
        let config = self.shared.config_handle();
        let run_info = self.run_info.as_ref().ok_or(MemberError::NotInitialized)?;
        let (param_step, param_state) = (run_info.init_step_parameters, run_info.init_state_parameter);
        let (dyn_step, dyn_state) = (run_info.step1, run_info.init_state_dynamic);

        if clear && run_path.exists() {
            fs::remove_dir_all(run_path)?;
        }
        fs::create_dir_all(run_path)?;

        for key in self.nodes.keys_of_kind(VarKind::Parameter) {
            let node = self.nodes.get_node_mut(&key)?;
            if resample || !node.has_data(param_step, param_state) {
                node.resample(&mut self.rng, param_step, param_state);
            }
            let value = node
                .value(param_step, param_state)
                .and_then(|values| values.first().copied())
                .ok_or_else(|| MemberError::NodeNotFound { key: key.clone() })?;
            fs::write(
                run_path.join(format!("{key}.INC")),
                format!("{key}\n  {value:.8} /\n"),
            )?;
        }

        let mut state_records = Vec::new();
        for key in self.nodes.keys_of_kind(VarKind::DynamicState) {
            let node = self.nodes.get_node(&key)?;
            if let Some(values) = node.value(dyn_step, dyn_state) {
                let keyword: String = key.chars().take(8).collect();
                state_records.push(EclRecord::new(&keyword, EclData::Doub(values.to_vec()))?);
            }
        }
        if !state_records.is_empty() {
            let path = run_path.join(ecl_filename(
                &self.eclbase,
                EclFileKind::RestartStep(dyn_step),
                config.ecl.formatted,
            ));
            write_records(&path, &state_records)?;
        }

        for template in &config.model.templates {
            let source = PathBuf::from(self.subst.filter(&template.source, &mut self.rng));
            let target = run_path.join(self.subst.filter(&template.target, &mut self.rng));
            self.subst.filter_file(&source, &target, &mut self.rng)?;
        }
        Ok(())
    }

    fn job_spec(&self, run_path: &Path) -> JobSpec {
        let config = self.shared.config();
        JobSpec {
            name: format!("{}-{:04}", config.model.case_name, self.iens),
            script: PathBuf::from(&config.site.job_script),
            run_path: run_path.to_path_buf(),
            args: vec![],
            num_cpu: config.site.num_cpu,
        }
    }

    fn should_delete_runpath(&self, mode: RunMode) -> bool {
        match self.keep_runpath {
            Some(keep) => !keep,
            None => match self.shared.config().model.keep_runpath {
                RunpathRetention::KeepAll => false,
                RunpathRetention::DeleteAll => true,
                RunpathRetention::Default => matches!(mode, RunMode::EnkfAssimilation),
            },
        }
    }
}

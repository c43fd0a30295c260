//! Per-member run bookkeeping.

use crate::{MemberError, MemberResult};
use en_core::{ReportStep, StateKind};
use en_queue::QueueIndex;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    EnsembleExperiment,
    EnsemblePrediction,
    EnkfAssimilation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NotStarted,
    Running,
    RunOk,
    RunFailure,
    LoadFailure,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::RunOk | RunStatus::RunFailure | RunStatus::LoadFailure
        )
    }
}

/// Where the member's run directory is in its life.
///
/// The success/failure asymmetry is intentional: a failed realization keeps
/// its directory on disk so the operator can inspect it post-mortem, while a
/// successful one releases the path once its results are internalized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunPathState {
    #[default]
    Unset,
    InFlight(PathBuf),
    Retained(PathBuf),
    Cleared,
}

impl RunPathState {
    pub fn path(&self) -> Option<&Path> {
        match self {
            RunPathState::InFlight(path) | RunPathState::Retained(path) => Some(path),
            RunPathState::Unset | RunPathState::Cleared => None,
        }
    }
}

/// Arguments for one simulation attempt.
#[derive(Debug, Clone)]
pub struct RunInit {
    pub mode: RunMode,
    pub active: bool,
    pub init_step_parameters: ReportStep,
    pub init_state_parameter: StateKind,
    pub init_state_dynamic: StateKind,
    pub load_start: ReportStep,
    pub step1: ReportStep,
    pub step2: ReportStep,
}

/// State of one member's current simulation attempt.
#[derive(Debug)]
pub struct RunInfo {
    pub(crate) mode: RunMode,
    pub(crate) active: bool,
    pub(crate) init_step_parameters: ReportStep,
    pub(crate) init_state_parameter: StateKind,
    pub(crate) init_state_dynamic: StateKind,
    pub(crate) load_start: ReportStep,
    pub(crate) step1: ReportStep,
    pub(crate) step2: ReportStep,
    pub(crate) max_internal_submit: u32,
    pub(crate) num_internal_submit: u32,
    pub(crate) run_path: RunPathState,
    pub(crate) queue_index: Option<QueueIndex>,
    pub(crate) run_status: RunStatus,
}

impl RunInfo {
    pub fn new(init: &RunInit, max_internal_submit: u32) -> MemberResult<Self> {
        if init.step1 > init.step2 {
            return Err(MemberError::InvalidRunWindow {
                reason: format!("step1 {} is after step2 {}", init.step1, init.step2),
            });
        }
        if init.load_start > init.step2 {
            return Err(MemberError::InvalidRunWindow {
                reason: format!(
                    "load_start {} is after step2 {}",
                    init.load_start, init.step2
                ),
            });
        }
        if max_internal_submit == 0 {
            return Err(MemberError::InvalidRunWindow {
                reason: "max_internal_submit must be at least 1".to_string(),
            });
        }
        Ok(Self {
            mode: init.mode,
            active: init.active,
            init_step_parameters: init.init_step_parameters,
            init_state_parameter: init.init_state_parameter,
            init_state_dynamic: init.init_state_dynamic,
            load_start: init.load_start,
            step1: init.step1,
            step2: init.step2,
            max_internal_submit,
            num_internal_submit: 0,
            run_path: RunPathState::Unset,
            queue_index: None,
            run_status: RunStatus::NotStarted,
        })
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn run_status(&self) -> RunStatus {
        self.run_status
    }

    pub fn num_internal_submit(&self) -> u32 {
        self.num_internal_submit
    }

    pub fn run_path(&self) -> &RunPathState {
        &self.run_path
    }

    pub fn queue_index(&self) -> Option<QueueIndex> {
        self.queue_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> RunInit {
        RunInit {
            mode: RunMode::EnsembleExperiment,
            active: true,
            init_step_parameters: 0,
            init_state_parameter: StateKind::Analyzed,
            init_state_dynamic: StateKind::Forecast,
            load_start: 1,
            step1: 0,
            step2: 5,
        }
    }

    #[test]
    fn fresh_run_info_is_not_started() {
        let info = RunInfo::new(&init(), 2).unwrap();
        assert_eq!(info.run_status(), RunStatus::NotStarted);
        assert_eq!(info.num_internal_submit(), 0);
        assert_eq!(info.run_path(), &RunPathState::Unset);
        assert!(info.queue_index().is_none());
    }

    #[test]
    fn inverted_step_window_is_rejected() {
        let mut bad = init();
        bad.step1 = 6;
        assert!(matches!(
            RunInfo::new(&bad, 2),
            Err(MemberError::InvalidRunWindow { .. })
        ));
    }

    #[test]
    fn load_start_beyond_window_is_rejected() {
        let mut bad = init();
        bad.load_start = 9;
        assert!(RunInfo::new(&bad, 2).is_err());
    }

    #[test]
    fn run_path_state_exposes_path_only_while_on_disk() {
        let path = PathBuf::from("/tmp/run0");
        assert_eq!(RunPathState::Unset.path(), None);
        assert_eq!(RunPathState::Cleared.path(), None);
        assert_eq!(
            RunPathState::InFlight(path.clone()).path(),
            Some(path.as_path())
        );
        assert_eq!(RunPathState::Retained(path.clone()).path(), Some(path.as_path()));
    }
}

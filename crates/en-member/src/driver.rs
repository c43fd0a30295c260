//! Ensemble-level orchestration: start every member, dispatch queue events.

use crate::controller::MemberController;
use crate::nodes::{EnsembleNode, VarKind};
use crate::run_info::{RunInit, RunStatus};
use crate::shared::SharedInfo;
use crate::{MemberError, MemberResult};
use en_queue::{JobOutcome, QueueError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const EVENT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Partial-failure accounting for one ensemble run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleReport {
    pub num_successful: usize,
    pub num_failed: usize,
}

pub struct EnsembleDriver {
    shared: Arc<SharedInfo>,
    members: Vec<MemberController>,
}

impl EnsembleDriver {
    /// One controller per realization, each with its own stream seeded from
    /// the master seed.
    pub fn new(shared: Arc<SharedInfo>, master_seed: u64) -> Self {
        let mut master_rng = StdRng::seed_from_u64(master_seed);
        let members = (0..shared.config().model.num_realizations)
            .map(|iens| MemberController::new(iens, Arc::clone(&shared), &mut master_rng))
            .collect();
        Self { shared, members }
    }

    /// Register a summary variable to internalize for every member.
    pub fn add_result_node(&mut self, gen_key: &str) {
        for member in &mut self.members {
            member.add_node(EnsembleNode::new(gen_key, VarKind::DynamicResult));
        }
    }

    pub fn members(&self) -> &[MemberController] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [MemberController] {
        &mut self.members
    }

    /// Run the whole ensemble to terminal state. Sibling members are
    /// independent: one failed realization never aborts the others.
    pub fn run(&mut self, init: &RunInit) -> MemberResult<EnsembleReport> {
        for member in &mut self.members {
            member.init_run(init.clone())?;
        }

        // run-directory preparation is blocking I/O, fan it out
        let started: Vec<MemberResult<()>> = self
            .members
            .par_iter_mut()
            .map(MemberController::start_forward_model)
            .collect();
        for result in started {
            result?;
        }

        let events = self.shared.queue().events();
        let mut outstanding = self
            .members
            .iter()
            .filter(|member| member.queue_index().is_some())
            .count();

        while outstanding > 0 {
            let event = events
                .recv_timeout(EVENT_TIMEOUT)
                .map_err(|_| MemberError::Queue(QueueError::ShutDown))?;
            let Some(member) = self
                .members
                .iter_mut()
                .find(|member| member.queue_index() == Some(event.queue_index))
            else {
                continue;
            };

            match event.outcome {
                JobOutcome::Ok => {
                    member.on_job_ok()?;
                }
                JobOutcome::Failed { .. } | JobOutcome::Killed => {
                    member.on_job_exit()?;
                }
            }
            if member.simple_run_status().is_terminal() {
                outstanding -= 1;
            }
        }

        let num_successful = self
            .members
            .iter()
            .filter(|member| member.simple_run_status() == RunStatus::RunOk)
            .count();
        let num_failed = self
            .members
            .iter()
            .filter(|member| {
                matches!(
                    member.simple_run_status(),
                    RunStatus::RunFailure | RunStatus::LoadFailure
                )
            })
            .count();

        info!(num_successful, num_failed, "ensemble run finished");
        Ok(EnsembleReport {
            num_successful,
            num_failed,
        })
    }
}

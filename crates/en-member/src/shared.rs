//! Process-wide context shared by every member controller, read-only from
//! the controllers' perspective.

use en_config::{ExperimentConfig, Substituter, config_fingerprint, tokens};
use en_queue::JobQueue;
use std::sync::Arc;

pub struct SharedInfo {
    config: Arc<ExperimentConfig>,
    queue: Arc<JobQueue>,
    base_subst: Substituter,
    case_id: String,
}

impl SharedInfo {
    pub fn new(config: Arc<ExperimentConfig>, queue: Arc<JobQueue>) -> Self {
        let mut base_subst = Substituter::new();
        base_subst.set(tokens::CASE, config.model.case_name.clone());
        base_subst.declare(tokens::INIT);

        let case_id = config_fingerprint(&config);
        Self {
            config,
            queue,
            base_subst,
            case_id,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn config_handle(&self) -> Arc<ExperimentConfig> {
        Arc::clone(&self.config)
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn base_subst(&self) -> &Substituter {
        &self.base_subst
    }

    /// Content hash of the configuration, recorded as the ensemble case id.
    pub fn case_id(&self) -> &str {
        &self.case_id
    }
}

//! Content-based hashing for ensemble case IDs.

use crate::schema::ExperimentConfig;
use sha2::{Digest, Sha256};

/// Stable hex fingerprint of a configuration, used as the case id in run
/// manifests. Two identical configs always fingerprint the same.
pub fn config_fingerprint(config: &ExperimentConfig) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use chrono::NaiveDate;

    fn config(name: &str) -> ExperimentConfig {
        ExperimentConfig {
            name: name.to_string(),
            site: SiteConfig {
                job_script: "run_job.sh".to_string(),
                max_running: 2,
                num_cpu: 1,
                driver_options: Default::default(),
            },
            model: ModelConfig {
                num_realizations: 3,
                runpath: "simulations/run<IENS>".to_string(),
                case_name: name.to_string(),
                pre_clear_runpath: false,
                keep_runpath: RunpathRetention::Default,
                max_internal_submit: 2,
                templates: vec![],
            },
            ecl: EclConfig {
                eclbase: "CASE_<IENS>".to_string(),
                data_file: "CASE.DATA".to_string(),
                grid: GridDef {
                    nx: 10,
                    ny: 10,
                    nz: 5,
                },
                start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                formatted: false,
                unified: true,
                static_kw: vec![],
                end_time_days: None,
            },
            parameters: vec![],
        }
    }

    #[test]
    fn fingerprint_stability() {
        let cfg = config("demo");
        assert_eq!(config_fingerprint(&cfg), config_fingerprint(&cfg));
    }

    #[test]
    fn fingerprint_differs_for_different_configs() {
        assert_ne!(
            config_fingerprint(&config("demo")),
            config_fingerprint(&config("other"))
        );
    }
}

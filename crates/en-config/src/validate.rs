//! Configuration validation logic.

use crate::schema::ExperimentConfig;
use crate::subst::tokens;
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_config(config: &ExperimentConfig) -> Result<(), ValidationError> {
    if config.model.num_realizations == 0 {
        return Err(invalid("model.num_realizations", "0", "must be at least 1"));
    }
    if config.model.max_internal_submit == 0 {
        return Err(invalid(
            "model.max_internal_submit",
            "0",
            "must be at least 1",
        ));
    }
    if config.site.max_running == 0 {
        return Err(invalid("site.max_running", "0", "must be at least 1"));
    }
    if !config.model.runpath.contains(tokens::IENS) {
        return Err(invalid(
            "model.runpath",
            &config.model.runpath,
            "template must contain <IENS> so member run paths are distinct",
        ));
    }
    if config.ecl.eclbase.is_empty() {
        return Err(invalid("ecl.eclbase", "", "must not be empty"));
    }

    let grid = &config.ecl.grid;
    if grid.nx <= 0 || grid.ny <= 0 || grid.nz <= 0 {
        return Err(invalid(
            "ecl.grid",
            &format!("{}x{}x{}", grid.nx, grid.ny, grid.nz),
            "all dimensions must be positive",
        ));
    }
    if let Some(end) = config.ecl.end_time_days {
        if end <= 0.0 {
            return Err(invalid(
                "ecl.end_time_days",
                &end.to_string(),
                "must be positive",
            ));
        }
    }

    let mut names = HashSet::new();
    for param in &config.parameters {
        if !names.insert(&param.name) {
            return Err(ValidationError::DuplicateId {
                id: param.name.clone(),
                context: "parameters".to_string(),
            });
        }
        if !(param.low < param.high) {
            return Err(invalid(
                &format!("parameters.{}", param.name),
                &format!("[{}, {}]", param.low, param.high),
                "low must be strictly below high",
            ));
        }
    }

    Ok(())
}

fn invalid(field: &str, value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

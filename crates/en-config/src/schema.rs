//! Experiment schema definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentConfig {
    pub name: String,
    pub site: SiteConfig,
    pub model: ModelConfig,
    pub ecl: EclConfig,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
}

/// Site-wide queue settings, shared by every member of the ensemble.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    pub job_script: String,
    #[serde(default = "default_max_running")]
    pub max_running: usize,
    #[serde(default = "default_num_cpu")]
    pub num_cpu: u32,
    #[serde(default)]
    pub driver_options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub num_realizations: u32,
    /// Run directory template, e.g. `simulations/run<IENS>`.
    pub runpath: String,
    pub case_name: String,
    #[serde(default)]
    pub pre_clear_runpath: bool,
    #[serde(default)]
    pub keep_runpath: RunpathRetention,
    #[serde(default = "default_max_internal_submit")]
    pub max_internal_submit: u32,
    #[serde(default)]
    pub templates: Vec<TemplateDef>,
}

/// What happens to a member's run directory after a successful load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunpathRetention {
    /// Decided by the run mode: assimilation deletes, experiments keep.
    #[default]
    Default,
    KeepAll,
    DeleteAll,
}

/// A text file instantiated into each run directory with tokens substituted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateDef {
    pub source: String,
    /// Target filename inside the run directory.
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EclConfig {
    /// Simulation case basename template, e.g. `CASE_<IENS>`.
    pub eclbase: String,
    pub data_file: String,
    pub grid: GridDef,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub formatted: bool,
    #[serde(default = "default_unified")]
    pub unified: bool,
    #[serde(default = "default_static_kw")]
    pub static_kw: Vec<String>,
    /// Expected simulation end time in days; a shorter summary is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_days: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridDef {
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
}

/// A scalar parameter sampled uniformly per member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDef {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

fn default_max_running() -> usize {
    4
}

fn default_num_cpu() -> u32 {
    1
}

fn default_max_internal_submit() -> u32 {
    2
}

fn default_unified() -> bool {
    true
}

fn default_static_kw() -> Vec<String> {
    ["INTEHEAD", "LOGIHEAD", "DOUBHEAD"]
        .into_iter()
        .map(String::from)
        .collect()
}

//! The registry: one owned node arena, several lookup indices over it.
//!
//! The arena (`Vec<SmspecNode>`) is the sole owner of node data; every index
//! map stores arena positions, never nodes. Re-adding an existing general
//! key replaces the arena slot in place, so the column accounting stays
//! idempotent and lookups resolve to the latest definition.

use crate::error::{SmspecError, SmspecResult};
use crate::node::{LgrLocation, SmspecNode, SmspecVarKind, classify};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Global grid dimensions, used to translate a block number into `i,j,k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDims {
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
}

impl GridDims {
    pub fn new(nx: i32, ny: i32, nz: i32) -> Self {
        Self { nx, ny, nz }
    }

    /// Translate a 1-based global cell number to 1-based (i, j, k).
    pub fn ijk(&self, num: i32) -> (i32, i32, i32) {
        let zero = num - 1;
        let layer = self.nx * self.ny;
        let k = zero / layer;
        let rem = zero % layer;
        (rem % self.nx + 1, rem / self.nx + 1, k + 1)
    }

    /// Inverse of [`GridDims::ijk`].
    pub fn cell_num(&self, i: i32, j: i32, k: i32) -> i32 {
        (i - 1) + (j - 1) * self.nx + (k - 1) * self.nx * self.ny + 1
    }
}

/// Unit system declared in the header's INTEHEAD record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnitSystem {
    #[default]
    Metric,
    Field,
    Lab,
}

impl UnitSystem {
    pub fn code(self) -> i32 {
        match self {
            UnitSystem::Metric => 1,
            UnitSystem::Field => 2,
            UnitSystem::Lab => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(UnitSystem::Metric),
            2 => Some(UnitSystem::Field),
            3 => Some(UnitSystem::Lab),
            _ => None,
        }
    }
}

/// Default simulator id written to INTEHEAD.
pub const SIMULATOR_ID: i32 = 100;

/// Typed, multiply-indexed catalogue of summary variables.
pub struct SmspecRegistry {
    nodes: Vec<SmspecNode>,
    general: HashMap<String, usize>,
    field: HashMap<String, usize>,
    misc: HashMap<String, usize>,
    well: HashMap<(String, String), usize>,
    group: HashMap<(String, String), usize>,
    region: HashMap<(i32, String), usize>,
    block: HashMap<(i32, String), usize>,
    completion: HashMap<(String, i32, String), usize>,
    params_size: usize,
    dims: GridDims,
    start_date: NaiveDate,
    unit_system: UnitSystem,
    simulator: i32,
    restart_case: Option<String>,
    restart_step: i32,
}

impl SmspecRegistry {
    pub fn new(dims: GridDims, start_date: NaiveDate) -> Self {
        Self {
            nodes: Vec::new(),
            general: HashMap::new(),
            field: HashMap::new(),
            misc: HashMap::new(),
            well: HashMap::new(),
            group: HashMap::new(),
            region: HashMap::new(),
            block: HashMap::new(),
            completion: HashMap::new(),
            params_size: 0,
            dims,
            start_date,
            unit_system: UnitSystem::default(),
            simulator: SIMULATOR_ID,
            restart_case: None,
            restart_step: -1,
        }
    }

    pub fn set_unit_system(&mut self, unit_system: UnitSystem) {
        self.unit_system = unit_system;
    }

    pub fn set_simulator(&mut self, simulator: i32) {
        self.simulator = simulator;
    }

    /// Declare that this case continues from `case` at `step`.
    pub fn set_restart_case(&mut self, case: &str, step: i32) {
        self.restart_case = Some(case.to_string());
        self.restart_step = step;
    }

    /// Add a variable. Returns its column position, or `None` when the
    /// classifier places the row in no kind (the row is not inserted).
    pub fn add_node(
        &mut self,
        keyword: &str,
        wgname: Option<&str>,
        num: Option<i32>,
        unit: &str,
        default: f32,
    ) -> Option<usize> {
        let kind = classify(keyword, wgname, num);
        if matches!(
            kind,
            SmspecVarKind::Skip
                | SmspecVarKind::LocalWell
                | SmspecVarKind::LocalBlock
                | SmspecVarKind::LocalCompletion
        ) {
            // local kinds need an LgrLocation; use add_local_node
            return None;
        }
        Some(self.insert(kind, keyword, wgname, num, unit, default, None))
    }

    /// Add a local-grid (LGR) variable. Local kinds are reachable only
    /// through the general-key index.
    pub fn add_local_node(
        &mut self,
        keyword: &str,
        wgname: Option<&str>,
        num: Option<i32>,
        unit: &str,
        default: f32,
        lgr: LgrLocation,
    ) -> Option<usize> {
        let kind = classify(keyword, wgname, num);
        match kind {
            SmspecVarKind::LocalWell | SmspecVarKind::LocalBlock | SmspecVarKind::LocalCompletion => {
                Some(self.insert(kind, keyword, wgname, num, unit, default, Some(lgr)))
            }
            _ => None,
        }
    }

    /// Reserve a column for a variable declared now and defined later.
    /// The node serializes with sentinel keyword/name and a reader will
    /// skip it.
    pub fn add_blank_node(&mut self) -> usize {
        self.insert(SmspecVarKind::Skip, "", None, None, "", 0.0, None)
    }

    pub(crate) fn insert(
        &mut self,
        kind: SmspecVarKind,
        keyword: &str,
        wgname: Option<&str>,
        num: Option<i32>,
        unit: &str,
        default: f32,
        lgr: Option<LgrLocation>,
    ) -> usize {
        let gen_key = compose_gen_key(kind, keyword, wgname, num, lgr.as_ref(), &self.dims);
        let alias = compose_alias_key(kind, keyword, wgname, num, &self.dims);

        let existing = gen_key.as_ref().and_then(|k| self.general.get(k)).copied();
        let params_index = match existing {
            Some(idx) => self.nodes[idx].params_index,
            None => self.params_size,
        };

        let node = SmspecNode {
            params_index,
            kind,
            keyword: keyword.to_string(),
            wgname: wgname.map(str::to_string),
            num,
            unit: unit.to_string(),
            default,
            lgr,
        };

        let arena_idx = match existing {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        if let Some(key) = gen_key {
            self.general.insert(key, arena_idx);
        }
        if let Some(key) = alias {
            self.general.insert(key, arena_idx);
        }

        match kind {
            SmspecVarKind::Field => {
                self.field.insert(keyword.to_string(), arena_idx);
            }
            SmspecVarKind::Misc => {
                self.misc.insert(keyword.to_string(), arena_idx);
            }
            SmspecVarKind::Well => {
                let well = wgname.unwrap_or_default().to_string();
                self.well.insert((well, keyword.to_string()), arena_idx);
            }
            SmspecVarKind::Group => {
                let group = wgname.unwrap_or_default().to_string();
                self.group.insert((group, keyword.to_string()), arena_idx);
            }
            SmspecVarKind::Region => {
                self.region
                    .insert((num.unwrap_or_default(), keyword.to_string()), arena_idx);
            }
            SmspecVarKind::Block => {
                self.block
                    .insert((num.unwrap_or_default(), keyword.to_string()), arena_idx);
            }
            SmspecVarKind::Completion => {
                let well = wgname.unwrap_or_default().to_string();
                self.completion
                    .insert((well, num.unwrap_or_default(), keyword.to_string()), arena_idx);
            }
            // local kinds: general-key lookup only; Skip: no lookup at all
            SmspecVarKind::LocalWell
            | SmspecVarKind::LocalBlock
            | SmspecVarKind::LocalCompletion
            | SmspecVarKind::Skip => {}
        }

        // monotonic non-decreasing, idempotent on re-add
        self.params_size = self.params_size.max(params_index + 1);
        params_index
    }

    /// Width of the flat per-timestep vector.
    pub fn params_size(&self) -> usize {
        self.params_size
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion (column) order.
    pub fn nodes(&self) -> impl Iterator<Item = &SmspecNode> {
        self.nodes.iter()
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    pub fn simulator(&self) -> i32 {
        self.simulator
    }

    /// Predecessor case this one restarts from, if any. After a header
    /// read this is an absolute path.
    pub fn restart_case(&self) -> Option<&str> {
        self.restart_case.as_deref()
    }

    pub fn restart_step(&self) -> i32 {
        self.restart_step
    }

    fn get(&self, idx: Option<&usize>, key: String) -> SmspecResult<&SmspecNode> {
        match idx {
            Some(&i) => Ok(&self.nodes[i]),
            None => Err(SmspecError::KeyNotFound { key }),
        }
    }

    pub fn has_general_var(&self, key: &str) -> bool {
        self.general.contains_key(key)
    }

    pub fn general_var(&self, key: &str) -> SmspecResult<&SmspecNode> {
        self.get(self.general.get(key), key.to_string())
    }

    pub fn has_field_var(&self, keyword: &str) -> bool {
        self.field.contains_key(keyword)
    }

    pub fn field_var(&self, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(self.field.get(keyword), keyword.to_string())
    }

    pub fn has_misc_var(&self, keyword: &str) -> bool {
        self.misc.contains_key(keyword)
    }

    pub fn misc_var(&self, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(self.misc.get(keyword), keyword.to_string())
    }

    pub fn has_well_var(&self, well: &str, keyword: &str) -> bool {
        self.well
            .contains_key(&(well.to_string(), keyword.to_string()))
    }

    pub fn well_var(&self, well: &str, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(
            self.well.get(&(well.to_string(), keyword.to_string())),
            format!("{keyword}:{well}"),
        )
    }

    pub fn has_group_var(&self, group: &str, keyword: &str) -> bool {
        self.group
            .contains_key(&(group.to_string(), keyword.to_string()))
    }

    pub fn group_var(&self, group: &str, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(
            self.group.get(&(group.to_string(), keyword.to_string())),
            format!("{keyword}:{group}"),
        )
    }

    pub fn has_region_var(&self, num: i32, keyword: &str) -> bool {
        self.region.contains_key(&(num, keyword.to_string()))
    }

    pub fn region_var(&self, num: i32, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(
            self.region.get(&(num, keyword.to_string())),
            format!("{keyword}:{num}"),
        )
    }

    pub fn has_block_var(&self, num: i32, keyword: &str) -> bool {
        self.block.contains_key(&(num, keyword.to_string()))
    }

    pub fn block_var(&self, num: i32, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(
            self.block.get(&(num, keyword.to_string())),
            format!("{keyword}:{num}"),
        )
    }

    pub fn has_block_var_ijk(&self, i: i32, j: i32, k: i32, keyword: &str) -> bool {
        self.has_block_var(self.dims.cell_num(i, j, k), keyword)
    }

    pub fn block_var_ijk(&self, i: i32, j: i32, k: i32, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.block_var(self.dims.cell_num(i, j, k), keyword)
    }

    pub fn has_completion_var(&self, well: &str, num: i32, keyword: &str) -> bool {
        self.completion
            .contains_key(&(well.to_string(), num, keyword.to_string()))
    }

    pub fn completion_var(&self, well: &str, num: i32, keyword: &str) -> SmspecResult<&SmspecNode> {
        self.get(
            self.completion
                .get(&(well.to_string(), num, keyword.to_string())),
            format!("{keyword}:{well}:{num}"),
        )
    }
}

fn compose_gen_key(
    kind: SmspecVarKind,
    keyword: &str,
    wgname: Option<&str>,
    num: Option<i32>,
    lgr: Option<&LgrLocation>,
    dims: &GridDims,
) -> Option<String> {
    let wg = wgname.unwrap_or_default();
    match kind {
        SmspecVarKind::Field | SmspecVarKind::Misc => Some(keyword.to_string()),
        SmspecVarKind::Well | SmspecVarKind::Group => Some(format!("{keyword}:{wg}")),
        SmspecVarKind::Region => Some(format!("{keyword}:{}", num?)),
        SmspecVarKind::Block => {
            let (i, j, k) = dims.ijk(num?);
            Some(format!("{keyword}:{i},{j},{k}"))
        }
        SmspecVarKind::Completion => Some(format!("{keyword}:{wg}:{}", num?)),
        SmspecVarKind::LocalWell => {
            let lgr = lgr?;
            Some(format!("{keyword}:{}:{wg}", lgr.name))
        }
        SmspecVarKind::LocalBlock => {
            let lgr = lgr?;
            Some(format!("{keyword}:{}:{},{},{}", lgr.name, lgr.i, lgr.j, lgr.k))
        }
        SmspecVarKind::LocalCompletion => {
            let lgr = lgr?;
            Some(format!(
                "{keyword}:{}:{wg}:{},{},{}",
                lgr.name, lgr.i, lgr.j, lgr.k
            ))
        }
        SmspecVarKind::Skip => None,
    }
}

/// Secondary general key: the numeric form of block and completion
/// variables; every other kind has a single key.
fn compose_alias_key(
    kind: SmspecVarKind,
    keyword: &str,
    wgname: Option<&str>,
    num: Option<i32>,
    dims: &GridDims,
) -> Option<String> {
    match kind {
        SmspecVarKind::Block => Some(format!("{keyword}:{}", num?)),
        SmspecVarKind::Completion => {
            let (i, j, k) = dims.ijk(num?);
            Some(format!("{keyword}:{}:{i},{j},{k}", wgname.unwrap_or_default()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SmspecRegistry {
        SmspecRegistry::new(
            GridDims::new(10, 10, 5),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        )
    }

    #[test]
    fn reinsertion_is_idempotent_on_params_size() {
        let mut reg = registry();
        let first = reg.add_node("WOPR", Some("P1"), None, "SM3/DAY", 0.0).unwrap();
        let second = reg
            .add_node("WOPR", Some("P1"), None, "SM3/DAY", -1.0)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(reg.params_size(), 1);
        // last write wins
        assert_eq!(reg.general_var("WOPR:P1").unwrap().default_value(), -1.0);
    }

    #[test]
    fn classification_completeness() {
        let mut reg = registry();
        reg.add_node("FOPR", None, None, "SM3/DAY", 0.0).unwrap();
        reg.add_node("WOPR", Some("P1"), None, "SM3/DAY", 0.0).unwrap();
        reg.add_node("GGOR", Some("GR-A"), None, "SM3/SM3", 0.0).unwrap();
        reg.add_node("RPR", None, Some(4), "BARSA", 0.0).unwrap();
        reg.add_node("BPR", None, Some(25), "BARSA", 0.0).unwrap();

        assert!(reg.has_field_var("FOPR"));
        assert!(reg.has_well_var("P1", "WOPR"));
        assert!(reg.has_group_var("GR-A", "GGOR"));
        assert!(reg.has_region_var(4, "RPR"));
        assert!(reg.has_block_var(25, "BPR"));

        // cross-kind probes must all miss
        assert!(!reg.has_well_var("P1", "FOPR"));
        assert!(!reg.has_field_var("WOPR"));
        assert!(!reg.has_group_var("P1", "WOPR"));
        assert!(!reg.has_region_var(25, "BPR"));
        assert!(!reg.has_block_var(4, "RPR"));
    }

    #[test]
    fn block_var_has_ijk_alias() {
        let mut reg = registry();
        // num 25 in a 10x10 grid layer: i=5, j=3, k=1
        reg.add_node("BPR", None, Some(25), "BARSA", 0.0).unwrap();
        assert!(reg.has_general_var("BPR:5,3,1"));
        assert!(reg.has_general_var("BPR:25"));
        assert!(reg.has_block_var_ijk(5, 3, 1, "BPR"));
        assert_eq!(
            reg.general_var("BPR:25").unwrap().params_index(),
            reg.general_var("BPR:5,3,1").unwrap().params_index()
        );
    }

    #[test]
    fn completion_composite_keys() {
        let mut reg = registry();
        reg.add_node("CWIR", Some("I1"), Some(113), "SM3/DAY", 0.0)
            .unwrap();
        assert!(reg.has_completion_var("I1", 113, "CWIR"));
        assert!(reg.has_general_var("CWIR:I1:113"));
        // 113 -> i=3, j=2, k=2 in 10x10x5
        assert!(reg.has_general_var("CWIR:I1:3,2,2"));
    }

    #[test]
    fn blank_node_reserves_column() {
        let mut reg = registry();
        reg.add_node("FOPR", None, None, "SM3/DAY", 0.0).unwrap();
        let blank = reg.add_blank_node();
        let next = reg.add_node("FWCT", None, None, "", 0.0).unwrap();

        assert_eq!(blank, 1);
        assert_eq!(next, 2);
        assert_eq!(reg.params_size(), 3);
        assert_eq!(reg.node_count(), 3);
    }

    #[test]
    fn getter_fails_with_key_not_found() {
        let reg = registry();
        assert!(!reg.has_well_var("P9", "WOPR"));
        let err = reg.well_var("P9", "WOPR").unwrap_err();
        assert!(matches!(err, SmspecError::KeyNotFound { .. }));
    }

    #[test]
    fn local_node_general_key_only() {
        let mut reg = registry();
        let lgr = LgrLocation {
            name: "LGR1".to_string(),
            i: 2,
            j: 3,
            k: 1,
        };
        reg.add_local_node("LWOPR", Some("P1"), None, "SM3/DAY", 0.0, lgr)
            .unwrap();
        assert!(reg.has_general_var("LWOPR:LGR1:P1"));
        assert!(!reg.has_well_var("P1", "LWOPR"));
    }
}

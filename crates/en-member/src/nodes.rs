//! Per-member variable nodes.
//!
//! Every variable a member tracks lives in the [`NodeHash`] under its string
//! key. Nodes are exclusively owned by the hash; re-adding a key is a plain
//! map insert, so the old node is dropped in the same operation.

use crate::{MemberError, MemberResult};
use en_core::{ReportStep, StateKind};
use rand::Rng;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    DynamicState,
    StaticState,
    Parameter,
    DynamicResult,
}

/// Uniform sampling range for a scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub low: f64,
    pub high: f64,
}

impl ParamSpec {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..self.high)
    }
}

/// One variable of one member, with storage keyed by (report step, state).
#[derive(Debug, Clone)]
pub struct EnsembleNode {
    key: String,
    kind: VarKind,
    param: Option<ParamSpec>,
    data: BTreeMap<(ReportStep, StateKind), Vec<f64>>,
}

impl EnsembleNode {
    pub fn new(key: impl Into<String>, kind: VarKind) -> Self {
        Self {
            key: key.into(),
            kind,
            param: None,
            data: BTreeMap::new(),
        }
    }

    pub fn parameter(key: impl Into<String>, spec: ParamSpec) -> Self {
        Self {
            key: key.into(),
            kind: VarKind::Parameter,
            param: Some(spec),
            data: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn store(&mut self, step: ReportStep, state: StateKind, values: Vec<f64>) {
        self.data.insert((step, state), values);
    }

    pub fn value(&self, step: ReportStep, state: StateKind) -> Option<&[f64]> {
        self.data.get(&(step, state)).map(Vec::as_slice)
    }

    pub fn has_data(&self, step: ReportStep, state: StateKind) -> bool {
        self.data.contains_key(&(step, state))
    }

    /// Draw a fresh value from the member's stream. Only parameter nodes
    /// carry a sampling range; other kinds return `None` untouched.
    pub fn resample<R: Rng>(
        &mut self,
        rng: &mut R,
        step: ReportStep,
        state: StateKind,
    ) -> Option<f64> {
        let spec = self.param?;
        let value = spec.sample(rng);
        self.store(step, state, vec![value]);
        Some(value)
    }
}

/// The member's variable map. Replace-on-re-add, no duplicates.
#[derive(Debug, Default)]
pub struct NodeHash {
    nodes: BTreeMap<String, EnsembleNode>,
}

impl NodeHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: EnsembleNode) {
        self.nodes.insert(node.key.clone(), node);
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get_node(&self, key: &str) -> MemberResult<&EnsembleNode> {
        self.nodes.get(key).ok_or_else(|| MemberError::NodeNotFound {
            key: key.to_string(),
        })
    }

    pub fn get_node_mut(&mut self, key: &str) -> MemberResult<&mut EnsembleNode> {
        self.nodes
            .get_mut(key)
            .ok_or_else(|| MemberError::NodeNotFound {
                key: key.to_string(),
            })
    }

    pub fn keys_of_kind(&self, kind: VarKind) -> Vec<String> {
        self.nodes
            .values()
            .filter(|node| node.kind == kind)
            .map(|node| node.key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn re_adding_a_key_replaces_the_node() {
        let mut hash = NodeHash::new();
        hash.add_node(EnsembleNode::new("PORO", VarKind::Parameter));
        hash.add_node(EnsembleNode::new("PORO", VarKind::DynamicResult));

        assert_eq!(hash.len(), 1);
        assert_eq!(hash.get_node("PORO").unwrap().kind(), VarKind::DynamicResult);
    }

    #[test]
    fn missing_key_is_an_error() {
        let hash = NodeHash::new();
        assert!(!hash.has_key("FOPR"));
        assert!(matches!(
            hash.get_node("FOPR"),
            Err(MemberError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn parameter_samples_inside_its_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut node = EnsembleNode::parameter("PORO", ParamSpec { low: 0.1, high: 0.3 });

        for _ in 0..100 {
            let value = node.resample(&mut rng, 0, StateKind::Analyzed).unwrap();
            assert!((0.1..0.3).contains(&value));
        }
        assert!(node.has_data(0, StateKind::Analyzed));
    }

    #[test]
    fn non_parameter_nodes_do_not_resample() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut node = EnsembleNode::new("FOPR", VarKind::DynamicResult);
        assert_eq!(node.resample(&mut rng, 0, StateKind::Forecast), None);
    }

    #[test]
    fn storage_is_keyed_by_step_and_state() {
        let mut node = EnsembleNode::new("PRESSURE", VarKind::DynamicState);
        node.store(1, StateKind::Forecast, vec![1.0, 2.0]);
        node.store(1, StateKind::Analyzed, vec![3.0, 4.0]);

        assert_eq!(node.value(1, StateKind::Forecast), Some(&[1.0, 2.0][..]));
        assert_eq!(node.value(1, StateKind::Analyzed), Some(&[3.0, 4.0][..]));
        assert_eq!(node.value(2, StateKind::Forecast), None);
    }
}

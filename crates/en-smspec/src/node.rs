//! Summary variable nodes and their classification.

use core::fmt;

/// Placeholder entity name used by simulators for rows that carry no
/// well/group name. A row with this name never classifies as a well or
/// group variable.
pub const DUMMY_WELL: &str = ":+:+:+:+";

/// Keywords that are global bookkeeping rather than entity variables.
const MISC_KEYWORDS: &[&str] = &[
    "TIME", "DAY", "MONTH", "YEAR", "YEARS", "TCPU", "TCPUDAY", "ELAPSED", "NEWTON", "MSUMNEWT",
    "MLINEARS",
];

/// Variable kind, decided from (keyword, entity name, auxiliary number).
///
/// `Skip` is a first-class outcome: a row the classifier cannot place is
/// deliberately dropped from the lookup indices while still occupying its
/// column in the flat vector. Simulators emit such rows routinely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SmspecVarKind {
    Field,
    Well,
    Group,
    Region,
    Block,
    Completion,
    Misc,
    LocalWell,
    LocalBlock,
    LocalCompletion,
    Skip,
}

impl fmt::Display for SmspecVarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SmspecVarKind::Field => "field",
            SmspecVarKind::Well => "well",
            SmspecVarKind::Group => "group",
            SmspecVarKind::Region => "region",
            SmspecVarKind::Block => "block",
            SmspecVarKind::Completion => "completion",
            SmspecVarKind::Misc => "misc",
            SmspecVarKind::LocalWell => "local-well",
            SmspecVarKind::LocalBlock => "local-block",
            SmspecVarKind::LocalCompletion => "local-completion",
            SmspecVarKind::Skip => "skip",
        };
        write!(f, "{s}")
    }
}

fn valid_entity(wgname: Option<&str>) -> bool {
    matches!(wgname, Some(name) if !name.is_empty() && name != DUMMY_WELL)
}

fn positive(num: Option<i32>) -> bool {
    matches!(num, Some(n) if n > 0)
}

/// Classify a variable row. Local (LGR) kinds additionally require an LGR
/// location; the caller decides that, this function only looks at the
/// keyword convention.
pub fn classify(keyword: &str, wgname: Option<&str>, num: Option<i32>) -> SmspecVarKind {
    if keyword.is_empty() {
        return SmspecVarKind::Skip;
    }
    if MISC_KEYWORDS.contains(&keyword) {
        return SmspecVarKind::Misc;
    }

    let mut chars = keyword.chars();
    let first = chars.next().unwrap_or(' ');
    match first {
        'F' => SmspecVarKind::Field,
        'W' if valid_entity(wgname) => SmspecVarKind::Well,
        'G' if valid_entity(wgname) => SmspecVarKind::Group,
        'R' if positive(num) => SmspecVarKind::Region,
        'B' if positive(num) => SmspecVarKind::Block,
        'C' if valid_entity(wgname) && positive(num) => SmspecVarKind::Completion,
        'L' => match chars.next() {
            Some('W') if valid_entity(wgname) => SmspecVarKind::LocalWell,
            Some('B') => SmspecVarKind::LocalBlock,
            Some('C') if valid_entity(wgname) => SmspecVarKind::LocalCompletion,
            _ => SmspecVarKind::Skip,
        },
        _ => SmspecVarKind::Skip,
    }
}

/// Cell location inside a local grid refinement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LgrLocation {
    pub name: String,
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

/// One summary variable. Immutable once inserted into the registry.
#[derive(Clone, Debug, PartialEq)]
pub struct SmspecNode {
    pub(crate) params_index: usize,
    pub(crate) kind: SmspecVarKind,
    pub(crate) keyword: String,
    pub(crate) wgname: Option<String>,
    pub(crate) num: Option<i32>,
    pub(crate) unit: String,
    pub(crate) default: f32,
    pub(crate) lgr: Option<LgrLocation>,
}

impl SmspecNode {
    /// Column position in the flat per-timestep vector.
    pub fn params_index(&self) -> usize {
        self.params_index
    }

    pub fn kind(&self) -> SmspecVarKind {
        self.kind
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn wgname(&self) -> Option<&str> {
        self.wgname.as_deref()
    }

    pub fn num(&self) -> Option<i32> {
        self.num
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    pub fn lgr(&self) -> Option<&LgrLocation> {
        self.lgr.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_and_misc() {
        assert_eq!(classify("FOPR", None, None), SmspecVarKind::Field);
        assert_eq!(classify("TIME", None, None), SmspecVarKind::Misc);
        assert_eq!(classify("YEARS", None, None), SmspecVarKind::Misc);
    }

    #[test]
    fn well_needs_entity() {
        assert_eq!(classify("WOPR", Some("P1"), None), SmspecVarKind::Well);
        assert_eq!(classify("WOPR", None, None), SmspecVarKind::Skip);
        assert_eq!(classify("WOPR", Some(""), None), SmspecVarKind::Skip);
        assert_eq!(classify("WOPR", Some(DUMMY_WELL), None), SmspecVarKind::Skip);
    }

    #[test]
    fn numbered_kinds_need_positive_num() {
        assert_eq!(classify("RPR", None, Some(3)), SmspecVarKind::Region);
        assert_eq!(classify("RPR", None, Some(0)), SmspecVarKind::Skip);
        assert_eq!(classify("BPR", None, Some(40)), SmspecVarKind::Block);
        assert_eq!(classify("BPR", None, None), SmspecVarKind::Skip);
    }

    #[test]
    fn completion_needs_both() {
        assert_eq!(
            classify("CWIR", Some("I1"), Some(12)),
            SmspecVarKind::Completion
        );
        assert_eq!(classify("CWIR", Some("I1"), None), SmspecVarKind::Skip);
        assert_eq!(classify("CWIR", None, Some(12)), SmspecVarKind::Skip);
    }

    #[test]
    fn local_kinds() {
        assert_eq!(classify("LWOPR", Some("P1"), None), SmspecVarKind::LocalWell);
        assert_eq!(classify("LBPR", None, None), SmspecVarKind::LocalBlock);
        assert_eq!(
            classify("LCOPR", Some("P1"), None),
            SmspecVarKind::LocalCompletion
        );
        assert_eq!(classify("LX", None, None), SmspecVarKind::Skip);
    }

    #[test]
    fn unknown_is_skip() {
        assert_eq!(classify("", None, None), SmspecVarKind::Skip);
        assert_eq!(classify("XABC", None, None), SmspecVarKind::Skip);
    }
}

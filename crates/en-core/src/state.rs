use core::fmt;

/// Which stored copy of a node to read or seed from.
///
/// `Forecast` is the state as propagated by the forward model; `Analyzed`
/// is the state after an update step has been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateKind {
    Forecast,
    Analyzed,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Forecast => write!(f, "forecast"),
            StateKind::Analyzed => write!(f, "analyzed"),
        }
    }
}

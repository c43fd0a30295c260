/// Discrete simulation checkpoint index at which state/results are saved.
///
/// Plain alias rather than a newtype: report steps take part in range
/// arithmetic (step windows, per-step file numbering) everywhere.
pub type ReportStep = i32;

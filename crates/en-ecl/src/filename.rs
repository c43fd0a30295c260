//! Simulator file naming.
//!
//! File roles are encoded in the extension: binary files use one letter
//! family (`SMSPEC`, `UNSMRY`, `Xnnnn`), formatted files another
//! (`FSMSPEC`, `FUNSMRY`, `Fnnnn`). Per-step files carry a 4-digit report
//! step in the extension.

use en_core::ReportStep;

/// Role of a simulator file alongside one case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EclFileKind {
    /// Summary index header.
    Smspec,
    /// All summary data in one file.
    UnifiedSummary,
    /// Summary data for one report step.
    SummaryStep(ReportStep),
    /// All restart snapshots in one file.
    UnifiedRestart,
    /// Restart snapshot for one report step.
    RestartStep(ReportStep),
    /// Initialization file.
    Init,
    /// Simulator input deck.
    Data,
}

/// Full filename for `base` in the given role.
pub fn ecl_filename(base: &str, kind: EclFileKind, formatted: bool) -> String {
    let ext = match (kind, formatted) {
        (EclFileKind::Smspec, false) => "SMSPEC".to_string(),
        (EclFileKind::Smspec, true) => "FSMSPEC".to_string(),
        (EclFileKind::UnifiedSummary, false) => "UNSMRY".to_string(),
        (EclFileKind::UnifiedSummary, true) => "FUNSMRY".to_string(),
        (EclFileKind::SummaryStep(step), false) => format!("S{:04}", step),
        (EclFileKind::SummaryStep(step), true) => format!("A{:04}", step),
        (EclFileKind::UnifiedRestart, false) => "UNRST".to_string(),
        (EclFileKind::UnifiedRestart, true) => "FUNRST".to_string(),
        (EclFileKind::RestartStep(step), false) => format!("X{:04}", step),
        (EclFileKind::RestartStep(step), true) => format!("F{:04}", step),
        (EclFileKind::Init, false) => "INIT".to_string(),
        (EclFileKind::Init, true) => "FINIT".to_string(),
        (EclFileKind::Data, _) => "DATA".to_string(),
    };
    format!("{base}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_names() {
        assert_eq!(ecl_filename("CASE", EclFileKind::Smspec, false), "CASE.SMSPEC");
        assert_eq!(
            ecl_filename("CASE", EclFileKind::UnifiedSummary, false),
            "CASE.UNSMRY"
        );
        assert_eq!(
            ecl_filename("CASE", EclFileKind::RestartStep(7), false),
            "CASE.X0007"
        );
        assert_eq!(
            ecl_filename("CASE", EclFileKind::SummaryStep(12), false),
            "CASE.S0012"
        );
    }

    #[test]
    fn formatted_names() {
        assert_eq!(ecl_filename("CASE", EclFileKind::Smspec, true), "CASE.FSMSPEC");
        assert_eq!(
            ecl_filename("CASE", EclFileKind::RestartStep(0), true),
            "CASE.F0000"
        );
    }
}

//! Token substitution for run paths and text templates.
//!
//! A [`Substituter`] holds an ordered list of token→value pairs. Tokens are
//! written `<NAME>` in templates. A token may be declared without a value; it
//! then substitutes as the literal placeholder `---` until assigned. The two
//! magic tokens `<RANDINT>` and `<RANDFLOAT>` draw a fresh value from the
//! caller's random stream at every occurrence.

use crate::ConfigResult;
use rand::Rng;
use std::path::Path;

/// Token names used in run-path and template substitution.
pub mod tokens {
    pub const RUNPATH: &str = "<RUNPATH>";
    pub const IENS: &str = "<IENS>";
    pub const IENS4: &str = "<IENS4>";
    pub const IENSP1: &str = "<IENSP1>";
    pub const ECLBASE: &str = "<ECLBASE>";
    pub const ECL_BASE: &str = "<ECL_BASE>";
    pub const CASE: &str = "<CASE>";
    pub const SMSPEC: &str = "<SMSPEC>";
    pub const TSTEP1: &str = "<TSTEP1>";
    pub const TSTEP2: &str = "<TSTEP2>";
    pub const TSTEP1_04: &str = "<TSTEP1_04>";
    pub const TSTEP2_04: &str = "<TSTEP2_04>";
    pub const RESTART_FILE1: &str = "<RESTART_FILE1>";
    pub const RESTART_FILE2: &str = "<RESTART_FILE2>";
    pub const INIT: &str = "<INIT>";
    pub const RANDINT: &str = "<RANDINT>";
    pub const RANDFLOAT: &str = "<RANDFLOAT>";
}

const UNASSIGNED: &str = "---";

#[derive(Debug, Clone, Default)]
pub struct Substituter {
    pairs: Vec<(String, Option<String>)>,
}

impl Substituter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a token without assigning it. Declared-but-unassigned tokens
    /// substitute as `---`.
    pub fn declare(&mut self, token: &str) {
        if !self.pairs.iter().any(|(t, _)| t == token) {
            self.pairs.push((token.to_string(), None));
        }
    }

    /// Assign a token, keeping its position if already present.
    pub fn set(&mut self, token: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(t, _)| t == token) {
            Some((_, slot)) => *slot = Some(value),
            None => self.pairs.push((token.to_string(), Some(value))),
        }
    }

    pub fn value(&self, token: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(t, _)| t == token)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Set `<IENS>`, `<IENS4>` and `<IENSP1>` from one member index.
    pub fn set_member_index(&mut self, iens: u32) {
        self.set(tokens::IENS, iens.to_string());
        self.set(tokens::IENS4, format!("{:04}", iens));
        self.set(tokens::IENSP1, (iens + 1).to_string());
    }

    /// Set the step-window tokens, both plain and 4-digit forms.
    pub fn set_step_window(&mut self, step1: i32, step2: i32) {
        self.set(tokens::TSTEP1, step1.to_string());
        self.set(tokens::TSTEP2, step2.to_string());
        self.set(tokens::TSTEP1_04, format!("{:04}", step1));
        self.set(tokens::TSTEP2_04, format!("{:04}", step2));
    }

    /// Substitute every known token in `input`, in declaration order.
    pub fn filter<R: Rng>(&self, input: &str, rng: &mut R) -> String {
        let mut out = input.to_string();
        for (token, value) in &self.pairs {
            let replacement = value.as_deref().unwrap_or(UNASSIGNED);
            out = out.replace(token.as_str(), replacement);
        }
        while let Some(pos) = out.find(tokens::RANDINT) {
            let draw: u32 = rng.r#gen();
            out.replace_range(pos..pos + tokens::RANDINT.len(), &draw.to_string());
        }
        while let Some(pos) = out.find(tokens::RANDFLOAT) {
            let draw: f64 = rng.r#gen();
            out.replace_range(pos..pos + tokens::RANDFLOAT.len(), &format!("{:.8}", draw));
        }
        out
    }

    /// Instantiate a template file: read `source`, substitute, write `target`.
    pub fn filter_file<R: Rng>(
        &self,
        source: &Path,
        target: &Path,
        rng: &mut R,
    ) -> ConfigResult<()> {
        let content = std::fs::read_to_string(source)?;
        std::fs::write(target, self.filter(&content, rng))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(17)
    }

    #[test]
    fn assigned_tokens_are_replaced_in_order() {
        let mut subst = Substituter::new();
        subst.set_member_index(7);
        subst.set(tokens::ECLBASE, "CASE_7");
        subst.set(tokens::ECL_BASE, "CASE_7");

        let out = subst.filter("run<IENS>/pad<IENS4>/one<IENSP1>/<ECLBASE>", &mut rng());
        assert_eq!(out, "run7/pad0007/one8/CASE_7");
    }

    #[test]
    fn declared_unassigned_becomes_placeholder() {
        let mut subst = Substituter::new();
        subst.declare(tokens::INIT);
        assert_eq!(subst.filter("include <INIT> here", &mut rng()), "include --- here");
    }

    #[test]
    fn assignment_overrides_declaration() {
        let mut subst = Substituter::new();
        subst.declare(tokens::INIT);
        subst.set(tokens::INIT, "EQUIL.INC");
        assert_eq!(subst.filter("<INIT>", &mut rng()), "EQUIL.INC");
    }

    #[test]
    fn step_window_tokens() {
        let mut subst = Substituter::new();
        subst.set_step_window(3, 12);
        let out = subst.filter("<TSTEP1>-<TSTEP2> <TSTEP1_04>-<TSTEP2_04>", &mut rng());
        assert_eq!(out, "3-12 0003-0012");
    }

    #[test]
    fn random_tokens_draw_per_occurrence() {
        let subst = Substituter::new();
        let mut r = rng();
        let out = subst.filter("<RANDINT> <RANDINT>", &mut r);
        let parts: Vec<&str> = out.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert_ne!(parts[0], parts[1]);
        assert!(parts.iter().all(|p| p.parse::<u32>().is_ok()));
    }

    #[test]
    fn random_float_is_parseable() {
        let subst = Substituter::new();
        let out = subst.filter("<RANDFLOAT>", &mut rng());
        let value: f64 = out.parse().unwrap();
        assert!((0.0..1.0).contains(&value));
    }

    #[test]
    fn unknown_text_is_untouched() {
        let subst = Substituter::new();
        assert_eq!(subst.filter("<NOT_A_TOKEN>", &mut rng()), "<NOT_A_TOKEN>");
    }
}

//! Embedding-host configuration, grounded on the teacher's `resource.rs`
//! `ResourceLimits`.
//!
//! GridLang's core has no persisted state (spec §6), but an embedding host
//! needs a small, explicit place to set the execution budget and choose a
//! backend.

/// Which of the two interchangeable execution strategies (spec §2) runs a
/// given program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    TreeWalk,
    #[default]
    Vm,
}

/// Host-tunable limits. `max_steps` is the deterministic, testable stand-in
/// spec §5 ("Timeouts... not defined; the host may impose a wall-clock
/// budget externally") permits: a dispatch-iteration counter instead of a
/// wall clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub max_call_depth: usize,
    pub max_steps: Option<u64>,
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_call_depth: 512, max_steps: None, backend: Backend::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_note() {
        let cfg = Config::default();
        assert_eq!(cfg.max_call_depth, 512);
        assert_eq!(cfg.max_steps, None);
        assert_eq!(cfg.backend, Backend::Vm);
    }
}

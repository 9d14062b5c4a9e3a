#![allow(dead_code)]

use ido_installer::types::{RunEnvironment, Step};

/// Builder for step lists to simplify test setup.
#[derive(Debug, Default)]
pub struct StepListBuilder {
    steps: Vec<Step>,
}

impl StepListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, name: &str, command: &str) -> Self {
        self.steps.push(Step::new(name, command));
        self
    }

    pub fn build(self) -> Vec<Step> {
        self.steps
    }
}

/// Shorthand for `[(name, command), ...]` step lists.
pub fn steps(pairs: &[(&str, &str)]) -> Vec<Step> {
    pairs
        .iter()
        .fold(StepListBuilder::new(), |b, (name, cmd)| b.step(name, cmd))
        .build()
}

/// Shorthand for `[(name, value), ...]` environments.
pub fn env(pairs: &[(&str, &str)]) -> RunEnvironment {
    pairs.iter().copied().collect()
}

/// Minimal plan TOML for the given steps, for loader tests.
pub fn plan_toml(pairs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (name, command) in pairs {
        out.push_str("[[step]]\n");
        out.push_str(&format!("name = {name:?}\n"));
        out.push_str(&format!("command = {command:?}\n\n"));
    }
    out
}

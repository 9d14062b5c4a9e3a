// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::DEFAULT_SHELL;
use crate::types::{RunEnvironment, Step};

/// Plan file exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// shell = "/bin/bash"
/// root = "."
///
/// [env]
/// IDO_CLUSTER_URL = "https://cluster.example"
///
/// [[step]]
/// name = "Install Cert-manager"
/// command = "packages/cert-manager/install.sh"
/// ```
///
/// The order of `[[step]]` entries is the execution order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Final `IDO_*` (or any other) variables handed to every step.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Interpreter used as `<shell> -c "<command>"`.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Installer root, the working directory of every step.
    ///
    /// Relative paths are resolved against the plan file's directory. When
    /// absent, the plan file's directory itself is used.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Seconds an aborted step gets to exit before its group is killed.
    #[serde(default = "default_kill_grace_secs")]
    pub kill_grace_secs: u64,
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_kill_grace_secs() -> u64 {
    10
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            root: None,
            kill_grace_secs: default_kill_grace_secs(),
        }
    }
}

/// `[[step]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub name: String,
    pub command: String,
}

/// A validated plan: what the wizard hands to the engine.
#[derive(Debug, Clone)]
pub struct PlanFile {
    config: ConfigSection,
    env: RunEnvironment,
    steps: Vec<Step>,
}

impl PlanFile {
    /// Build a plan without validation. Only the `TryFrom<RawPlanFile>`
    /// conversion should call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        env: BTreeMap<String, String>,
        steps: Vec<StepConfig>,
    ) -> Self {
        Self {
            config,
            env: RunEnvironment::from(env),
            steps: steps
                .into_iter()
                .map(|s| Step::new(s.name, s.command))
                .collect(),
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn env(&self) -> &RunEnvironment {
        &self.env
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

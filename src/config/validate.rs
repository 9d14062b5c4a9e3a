// src/config/validate.rs

use std::collections::HashSet;

use tracing::warn;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{InstallerError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = InstallerError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.env, raw.steps))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_steps(plan)?;
    validate_global_config(plan)?;
    validate_steps(plan)?;
    validate_env(plan)?;
    Ok(())
}

fn ensure_has_steps(plan: &RawPlanFile) -> Result<()> {
    if plan.steps.is_empty() {
        return Err(InstallerError::ConfigError(
            "plan must contain at least one [[step]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.shell.trim().is_empty() {
        return Err(InstallerError::ConfigError(
            "[config].shell must not be empty".to_string(),
        ));
    }

    if plan.config.kill_grace_secs == 0 {
        return Err(InstallerError::ConfigError(
            "[config].kill_grace_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_steps(plan: &RawPlanFile) -> Result<()> {
    let mut seen = HashSet::new();

    for (index, step) in plan.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(InstallerError::ConfigError(format!(
                "step #{} has an empty name",
                index + 1
            )));
        }
        if step.command.trim().is_empty() {
            return Err(InstallerError::ConfigError(format!(
                "step '{}' has an empty command",
                step.name
            )));
        }
        // Steps are identified by position, so a repeated name is legal.
        if !seen.insert(step.name.as_str()) {
            warn!(step = %step.name, index, "step name used more than once in plan");
        }
    }
    Ok(())
}

fn validate_env(plan: &RawPlanFile) -> Result<()> {
    for (name, value) in plan.env.iter() {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(InstallerError::ConfigError(format!(
                "invalid environment variable name '{}' in [env]",
                name.escape_debug()
            )));
        }
        if value.contains('\0') {
            return Err(InstallerError::ConfigError(format!(
                "environment variable '{}' contains a NUL byte",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_plan;

    fn validate(toml: &str) -> Result<PlanFile> {
        PlanFile::try_from(parse_plan(toml)?)
    }

    #[test]
    fn accepts_minimal_plan_with_defaults() {
        let plan = validate(
            r#"
[[step]]
name = "Final Check"
command = "packages/final-check.sh"
"#,
        )
        .unwrap();

        assert_eq!(plan.config().shell, "/bin/bash");
        assert_eq!(plan.config().kill_grace_secs, 10);
        assert!(plan.config().root.is_none());
        assert!(plan.env().is_empty());
        assert_eq!(plan.steps().len(), 1);
    }

    #[test]
    fn keeps_step_order_and_env() {
        let plan = validate(
            r#"
[env]
IDO_TIMEZONE = "UTC"
IDO_TLS_KEY = "tls-disabled"

[[step]]
name = "Install Prometheus"
command = "packages/prometheus/install.sh"

[[step]]
name = "Install Logging"
command = "packages/logging/install.sh"

[[step]]
name = "Final Check"
command = "packages/final-check.sh"
"#,
        )
        .unwrap();

        let names: Vec<_> = plan.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["Install Prometheus", "Install Logging", "Final Check"]
        );
        assert_eq!(plan.env().get("IDO_TIMEZONE"), Some("UTC"));
    }

    #[test]
    fn rejects_blank_command() {
        let err = validate(
            r#"
[[step]]
name = "A"
command = "   "
"#,
        )
        .unwrap_err();

        match err {
            InstallerError::ConfigError(msg) => assert!(msg.contains("empty command")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_env_name_with_equals_sign() {
        let err = validate(
            r#"
[env]
"BAD=NAME" = "x"

[[step]]
name = "A"
command = "true"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, InstallerError::ConfigError(msg) if msg.contains("BAD=NAME")));
    }

    #[test]
    fn rejects_zero_kill_grace() {
        let err = validate(
            r#"
[config]
kill_grace_secs = 0

[[step]]
name = "A"
command = "true"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, InstallerError::ConfigError(msg) if msg.contains("kill_grace_secs")));
    }

    #[test]
    fn duplicate_step_names_are_allowed() {
        let plan = validate(
            r#"
[[step]]
name = "A"
command = "true"

[[step]]
name = "A"
command = "true"
"#,
        )
        .unwrap();
        assert_eq!(plan.steps().len(), 2);
    }
}

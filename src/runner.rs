//! Configured targets through the engine, one session each.

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use chaos_core::{ChaosEngine, ChaosError, EngineOptions, ErrorReport, RunReport, RunStatus};

use crate::command_target::CommandSpec;
use crate::config::{resolve_program, ChaosConfig, TargetConfig};

/// What happened to one configured target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
    /// Errors reported without aborting the target.
    pub errors: Vec<ErrorReport>,
}

impl TargetOutcome {
    /// Ran to completion and nothing was reported along the way.
    pub fn is_clean(&self) -> bool {
        self.status.is_success() && self.errors.is_empty()
    }
}

/// Process exit code for a finished run: `0` when every outcome is clean.
pub fn exit_code(outcomes: &[TargetOutcome]) -> u8 {
    if outcomes.iter().all(TargetOutcome::is_clean) {
        0
    } else {
        1
    }
}

/// Run `targets` one after another.
pub async fn run_targets(
    config: &ChaosConfig,
    base_dir: &Path,
    targets: &[&TargetConfig],
) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets {
        outcomes.push(run_target(config, base_dir, target).await);
    }
    outcomes
}

pub async fn run_target(
    config: &ChaosConfig,
    base_dir: &Path,
    target: &TargetConfig,
) -> TargetOutcome {
    let destructives = config.destructives_for(target);
    let mut errors: Vec<ErrorReport> = Vec::new();
    if !destructives.skipped.is_empty() {
        errors.push(
            ChaosError::Configuration {
                invalid_categories: destructives.skipped.clone(),
            }
            .report(),
        );
    }

    let program = resolve_program(base_dir, &target.program);
    info!(name = %target.name, program = %program.display(), "running target");
    let function = CommandSpec::new(program, target.args.clone())
        .into_target(target.name.clone(), target.concurrent);

    let options = EngineOptions {
        function: Some(function),
        error_level: config.error_level_for(target),
        destructives: destructives.overlay,
    };
    let mut engine = match ChaosEngine::with_options(options) {
        Ok(engine) => engine,
        Err(err) => return aborted(target, err, errors),
    };
    let result = drive(&mut engine, target).await;
    errors.extend(engine.reported_errors().iter().cloned());

    match result {
        Ok(report) => TargetOutcome {
            name: target.name.clone(),
            status: report.status.clone(),
            report: Some(report),
            errors,
        },
        Err(err) => aborted(target, err, errors),
    }
}

fn aborted(target: &TargetConfig, err: ChaosError, errors: Vec<ErrorReport>) -> TargetOutcome {
    warn!(name = %target.name, kind = err.kind().short_name(), "target aborted: {}", err);
    TargetOutcome {
        name: target.name.clone(),
        status: RunStatus::Error {
            message: err.to_string(),
        },
        report: None,
        errors,
    }
}

async fn drive(engine: &mut ChaosEngine, target: &TargetConfig) -> Result<RunReport, ChaosError> {
    for input in &target.inputs {
        engine.add_argument(input.example(), input.descriptor())?;
    }
    if let Some(output) = &target.output {
        engine.set_expected_return(output.example(), output.descriptor())?;
    }
    if engine.is_async() {
        engine.run_async().await
    } else {
        // Sync command targets block on each child process.
        tokio::task::block_in_place(|| engine.run())
    }
}

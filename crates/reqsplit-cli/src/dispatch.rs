use color_eyre::Result;
use reqsplit_core::{
    list_imports, show_snapshot, update_requirements, CommandContext, CommandGroup, CommandInfo,
    EnvironmentRequest, ExecutionOutcome, ImportsRequest, SnapshotRequest, UpdateMode,
    UpdateRequest,
};

use crate::cli::{CommandGroupCli, EnvironmentArgs, InterpreterArgs, UpdateArgs};

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match group {
        CommandGroupCli::Update(args) => {
            let info = CommandInfo::new(CommandGroup::Update, "update");
            let request = update_request_from_args(args);
            core_call(info, || update_requirements(ctx, &request))
        }
        CommandGroupCli::Imports(args) => {
            let info = CommandInfo::new(CommandGroup::Imports, "imports");
            let request = ImportsRequest {
                project: args.project.clone(),
                environment: interpreter_request(&args.interpreter),
            };
            core_call(info, || list_imports(ctx, &request))
        }
        CommandGroupCli::Snapshot(args) => {
            let info = CommandInfo::new(CommandGroup::Snapshot, "snapshot");
            let request = SnapshotRequest {
                environment: environment_request(&args.environment),
            };
            core_call(info, || show_snapshot(ctx, &request))
        }
    }
}

fn update_request_from_args(args: &UpdateArgs) -> UpdateRequest {
    let mode = if args.check {
        UpdateMode::Check
    } else if args.dry_run {
        UpdateMode::DryRun
    } else {
        UpdateMode::Write
    };
    UpdateRequest {
        project: args.project.clone(),
        environment: environment_request(&args.environment),
        output_dir: args.output_dir.clone(),
        mode,
    }
}

fn interpreter_request(args: &InterpreterArgs) -> EnvironmentRequest {
    EnvironmentRequest {
        python: args.python.clone(),
        venv: args.venv.clone(),
        ..EnvironmentRequest::default()
    }
}

fn environment_request(args: &EnvironmentArgs) -> EnvironmentRequest {
    EnvironmentRequest {
        installed: args.installed.clone(),
        include_all: args.all,
        ..interpreter_request(&args.interpreter)
    }
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
            Ok((
                info,
                ExecutionOutcome::failure(
                    err.to_string(),
                    serde_json::json!({
                        "reason": "internal_error",
                        "error": err.to_string(),
                        "issues": issues,
                        "hint": "Re-run with `--trace` for more detail, or open an issue if this persists.",
                    }),
                ),
            ))
        }
    }
}

//! Command Extractor
//!
//! Decodes one tool invocation's raw JSON arguments into typed mutation
//! commands. Decoding is strict: unknown keys, missing required fields and
//! out-of-range values are rejected with an error naming the tool.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use taskmate_core::{
    AddDependenciesCommand, AddStepsCommand, DependencyAction, DependencyCondition,
    MarkFocusTodayCommand, MutationCommand, NewDependency, NewStep, StepFields, TaskFields,
    UpdateStepCommand, UpdateTaskCommand,
};

use crate::catalogue::{ADD_DEPENDENCIES, ADD_STEPS, MARK_TASKS_FOCUS_TODAY, UPDATE_STEPS, UPDATE_TASK};
use crate::error::{ToolError, ToolResultOf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateTaskArgs {
    task_id: i64,
    fields: TaskFields,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateStepsArgs {
    task_id: i64,
    updates: Vec<StepUpdateArgs>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepUpdateArgs {
    step_id: i64,
    fields: StepFields,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddStepsArgs {
    task_id: i64,
    #[serde(default)]
    parent_step_id: Option<i64>,
    steps: Vec<NewStepArgs>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NewStepArgs {
    title: String,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    estimate_minutes: Option<i64>,
    #[serde(default)]
    insert_after_step_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddDependenciesArgs {
    items: Vec<DependencyArgs>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencyArgs {
    predecessor_task_id: i64,
    #[serde(default)]
    predecessor_step_id: Option<i64>,
    successor_task_id: i64,
    #[serde(default)]
    successor_step_id: Option<i64>,
    condition: DependencyCondition,
    action: DependencyAction,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MarkTasksFocusTodayArgs {
    task_ids: Vec<i64>,
}

fn parse_args<T: DeserializeOwned>(tool: &str, raw: &str) -> ToolResultOf<T> {
    serde_json::from_str(raw).map_err(|e| ToolError::decode(tool, e))
}

/// Decode one invocation into an ordered list of commands.
///
/// `update_steps` expands to one `update_step` command per listed update;
/// every other tool yields exactly one command.
pub fn decode(tool_name: &str, raw_arguments: &str) -> ToolResultOf<Vec<MutationCommand>> {
    let commands = match tool_name {
        UPDATE_TASK => {
            let args: UpdateTaskArgs = parse_args(tool_name, raw_arguments)?;
            vec![MutationCommand::UpdateTask(UpdateTaskCommand {
                task_id: args.task_id,
                fields: args.fields,
            })]
        }
        UPDATE_STEPS => {
            let args: UpdateStepsArgs = parse_args(tool_name, raw_arguments)?;
            args.updates
                .into_iter()
                .map(|u| {
                    MutationCommand::UpdateStep(UpdateStepCommand {
                        task_id: args.task_id,
                        step_id: u.step_id,
                        fields: u.fields,
                    })
                })
                .collect()
        }
        ADD_STEPS => {
            let args: AddStepsArgs = parse_args(tool_name, raw_arguments)?;
            let steps = args
                .steps
                .into_iter()
                .map(|s| NewStep {
                    title: s.title,
                    detail: s.detail.unwrap_or_default(),
                    estimate_minutes: s.estimate_minutes,
                    insert_after_step_id: s.insert_after_step_id,
                })
                .collect();
            vec![MutationCommand::AddSteps(AddStepsCommand {
                task_id: args.task_id,
                parent_step_id: args.parent_step_id,
                steps,
            })]
        }
        ADD_DEPENDENCIES => {
            let args: AddDependenciesArgs = parse_args(tool_name, raw_arguments)?;
            let items = args
                .items
                .into_iter()
                .map(|d| NewDependency {
                    predecessor_task_id: d.predecessor_task_id,
                    predecessor_step_id: d.predecessor_step_id,
                    successor_task_id: d.successor_task_id,
                    successor_step_id: d.successor_step_id,
                    condition: d.condition,
                    action: d.action,
                })
                .collect();
            vec![MutationCommand::AddDependencies(AddDependenciesCommand { items })]
        }
        MARK_TASKS_FOCUS_TODAY => {
            let args: MarkTasksFocusTodayArgs = parse_args(tool_name, raw_arguments)?;
            vec![MutationCommand::MarkFocusToday(MarkFocusTodayCommand {
                task_ids: args.task_ids,
            })]
        }
        other => return Err(ToolError::unknown(other)),
    };

    for command in &commands {
        command
            .validate()
            .map_err(|e| ToolError::decode(tool_name, e))?;
    }

    tracing::debug!(tool = tool_name, commands = commands.len(), "decoded tool arguments");
    Ok(commands)
}

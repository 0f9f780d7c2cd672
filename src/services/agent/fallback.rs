//! Fallback Replies
//!
//! Deterministic assistant text used when the model's final reply is blank,
//! built from the kinds of commands produced.

use taskmate_core::{MutationCommand, StepStatus, TaskStatus};

use super::AgentKind;

const CLOSING: &str = "Let me know if you'd like any further changes.";

/// Reply text describing `commands`, or the agent's default sentence when
/// there is nothing to describe
pub fn fallback_message(agent: AgentKind, commands: &[MutationCommand]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut task_parts: Vec<String> = Vec::new();
    let mut has_task_update = false;
    let mut step_updates = 0usize;
    let mut step_status_counts = [0usize; 5];
    let mut added_steps = 0usize;
    let mut added_dependencies = 0usize;
    let mut focus_marks = 0usize;
    let mut created_tasks = 0usize;

    for command in commands {
        match command {
            MutationCommand::UpdateTask(cmd) => {
                has_task_update = true;
                let fields = &cmd.fields;
                if let Some(status) = fields.status {
                    task_parts.push(format!("task status set to {}", task_status_label(status)));
                }
                if let Some(priority) = fields.priority {
                    task_parts.push(format!("priority set to {}", priority));
                }
                if fields.due_at.is_some() {
                    task_parts.push("due date updated".to_string());
                }
                if fields.title.is_some() {
                    task_parts.push("task title updated".to_string());
                }
                if fields.description.is_some() {
                    task_parts.push("task description updated".to_string());
                }
            }
            MutationCommand::UpdateStep(cmd) => {
                step_updates += 1;
                if let Some(status) = cmd.fields.status {
                    step_status_counts[status_slot(status)] += 1;
                }
            }
            MutationCommand::AddSteps(cmd) => added_steps += cmd.steps.len(),
            MutationCommand::AddDependencies(cmd) => added_dependencies += cmd.items.len(),
            MutationCommand::MarkFocusToday(cmd) => focus_marks += cmd.task_ids.len(),
            MutationCommand::CreateTask(_) => created_tasks += 1,
        }
    }

    if has_task_update {
        if task_parts.is_empty() {
            parts.push("task details updated".to_string());
        } else {
            parts.push(task_parts.join(", "));
        }
    }

    if step_updates > 0 {
        let status_parts: Vec<String> = STATUS_ORDER
            .iter()
            .enumerate()
            .filter(|(slot, _)| step_status_counts[*slot] > 0)
            .map(|(slot, status)| {
                format!(
                    "{} marked {}",
                    count(step_status_counts[slot], "step", "steps"),
                    step_status_label(*status)
                )
            })
            .collect();
        if status_parts.is_empty() {
            parts.push(format!("updated {}", count(step_updates, "step", "steps")));
        } else {
            parts.push(status_parts.join(", "));
        }
    }

    if added_steps > 0 {
        parts.push(format!("added {}", count(added_steps, "step", "steps")));
    }
    if added_dependencies > 0 {
        parts.push(format!(
            "added {}",
            count(added_dependencies, "dependency", "dependencies")
        ));
    }
    if focus_marks > 0 {
        parts.push(format!(
            "marked {} as today's focus",
            count(focus_marks, "task", "tasks")
        ));
    }
    if created_tasks > 0 {
        parts.push(format!("created {}", count(created_tasks, "task", "tasks")));
    }

    if parts.is_empty() {
        return default_message(agent).to_string();
    }

    format!("{}. {}", capitalize(&parts.join("; ")), CLOSING)
}

/// Reply used when an agent produced neither text nor commands
pub fn default_message(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::Planner => {
            "Got your planning request. Tell me if the steps or schedule should change."
        }
        AgentKind::Global => {
            "Got your question. Tell me if you'd like me to keep organizing your tasks."
        }
        AgentKind::Summarizer => {
            "I've gathered the current task information. Ask me if you need a more detailed summary."
        }
        AgentKind::TaskCreation => "I couldn't turn that text into a task. Please try again.",
        AgentKind::Executor => "Got it. Let me know if you'd like any further changes.",
    }
}

const STATUS_ORDER: [StepStatus; 5] = [
    StepStatus::Done,
    StepStatus::InProgress,
    StepStatus::Todo,
    StepStatus::Blocked,
    StepStatus::Locked,
];

fn status_slot(status: StepStatus) -> usize {
    match status {
        StepStatus::Done => 0,
        StepStatus::InProgress => 1,
        StepStatus::Todo => 2,
        StepStatus::Blocked => 3,
        StepStatus::Locked => 4,
    }
}

fn step_status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Locked => "locked",
        StepStatus::Todo => "to do",
        StepStatus::InProgress => "in progress",
        StepStatus::Done => "done",
        StepStatus::Blocked => "blocked",
    }
}

fn task_status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "to do",
        TaskStatus::InProgress => "in progress",
        TaskStatus::Done => "done",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", n, plural)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

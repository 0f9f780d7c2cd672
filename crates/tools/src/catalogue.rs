//! Tool Catalogue
//!
//! The five task-graph tools offered to the model, with their JSON schemas,
//! and the subsets each agent role may use.

use serde_json::json;
use taskmate_llm::ToolDefinition;

pub const UPDATE_TASK: &str = "update_task";
pub const UPDATE_STEPS: &str = "update_steps";
pub const ADD_STEPS: &str = "add_steps";
pub const ADD_DEPENDENCIES: &str = "add_dependencies";
pub const MARK_TASKS_FOCUS_TODAY: &str = "mark_tasks_focus_today";

/// Every tool name, in catalogue order.
pub const ALL_TOOLS: &[&str] = &[
    UPDATE_TASK,
    UPDATE_STEPS,
    ADD_STEPS,
    ADD_DEPENDENCIES,
    MARK_TASKS_FOCUS_TODAY,
];

pub const EXECUTOR_TOOLS: &[&str] = &[UPDATE_TASK, UPDATE_STEPS];

pub const PLANNER_TOOLS: &[&str] = &[UPDATE_TASK, UPDATE_STEPS, ADD_STEPS, ADD_DEPENDENCIES];

pub const GLOBAL_TOOLS: &[&str] = &[UPDATE_TASK, UPDATE_STEPS, MARK_TASKS_FOCUS_TODAY];

/// Look up a catalogue definition by tool name.
pub fn definition(name: &str) -> Option<ToolDefinition> {
    let (description, schema) = match name {
        UPDATE_TASK => (
            "Update a task's metadata such as title, description, status, priority or due_at.",
            update_task_schema(),
        ),
        UPDATE_STEPS => (
            "Update one or more existing steps in a task.",
            update_steps_schema(),
        ),
        ADD_STEPS => ("Add new steps to an existing task.", add_steps_schema()),
        ADD_DEPENDENCIES => (
            "Create dependencies between tasks or steps. When the predecessor is done, the successor can be unlocked or activated.",
            add_dependencies_schema(),
        ),
        MARK_TASKS_FOCUS_TODAY => (
            "Mark one or more tasks as today's focus tasks, for daily planning or overview.",
            mark_tasks_focus_today_schema(),
        ),
        _ => return None,
    };
    Some(ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: schema,
    })
}

fn update_task_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "task_id": { "type": "integer", "description": "The ID of the task to update." },
            "fields": {
                "type": "object",
                "description": "Fields to update. Only include fields that need to be changed.",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "status": {
                        "type": "string",
                        "enum": ["todo", "in_progress", "done", "cancelled"]
                    },
                    "priority": {
                        "type": "string",
                        "enum": ["low", "medium", "high"]
                    },
                    "due_at": {
                        "type": "string",
                        "description": "New due date time in ISO 8601 format, e.g. 2025-12-08T20:00:00"
                    }
                },
                "additionalProperties": false
            }
        },
        "required": ["task_id", "fields"],
        "additionalProperties": false
    })
}

fn update_steps_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "task_id": { "type": "integer" },
            "updates": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "step_id": { "type": "integer" },
                        "fields": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "detail": { "type": "string" },
                                "status": {
                                    "type": "string",
                                    "enum": ["locked", "todo", "in_progress", "done", "blocked"]
                                },
                                "blocking_reason": { "type": "string" },
                                "estimate_minutes": { "type": "integer", "minimum": 1 },
                                "order_index": {
                                    "type": "integer",
                                    "description": "New order index, smaller means earlier."
                                },
                                "planned_start": {
                                    "type": "string",
                                    "description": "Planned start time in ISO 8601."
                                },
                                "planned_end": {
                                    "type": "string",
                                    "description": "Planned end time in ISO 8601."
                                }
                            },
                            "additionalProperties": false
                        }
                    },
                    "required": ["step_id", "fields"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["task_id", "updates"],
        "additionalProperties": false
    })
}

fn add_steps_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "task_id": { "type": "integer" },
            "parent_step_id": {
                "type": ["integer", "null"],
                "description": "Optional parent step ID for substeps. Use null for top-level steps."
            },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "detail": { "type": "string" },
                        "estimate_minutes": { "type": "integer", "minimum": 1 },
                        "insert_after_step_id": {
                            "type": ["integer", "null"],
                            "description": "Insert after this step. If null, append to the end."
                        }
                    },
                    "required": ["title"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["task_id", "steps"],
        "additionalProperties": false
    })
}

fn add_dependencies_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "predecessor_task_id": { "type": "integer" },
                        "predecessor_step_id": {
                            "type": ["integer", "null"],
                            "description": "Optional step ID. If null, the whole task is the predecessor."
                        },
                        "successor_task_id": { "type": "integer" },
                        "successor_step_id": {
                            "type": ["integer", "null"],
                            "description": "Optional step ID. If null, the whole task is the successor."
                        },
                        "condition": {
                            "type": "string",
                            "enum": ["task_done", "step_done"]
                        },
                        "action": {
                            "type": "string",
                            "enum": ["unlock_step", "set_task_todo", "notify_only"]
                        }
                    },
                    "required": ["predecessor_task_id", "successor_task_id", "condition", "action"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["items"],
        "additionalProperties": false
    })
}

fn mark_tasks_focus_today_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "task_ids": {
                "type": "array",
                "items": { "type": "integer" }
            }
        },
        "required": ["task_ids"],
        "additionalProperties": false
    })
}

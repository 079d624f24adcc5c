// src/engine/render.rs

//! Human-readable plan rendering.

use std::fmt::Write;

use crate::engine::plan::{ExecutionPlan, PlanStep, StepKind};

/// Render a plan as an indented tree:
///
/// ```text
/// serial
/// ├── fmt  format sources
/// └── parallel
///     ├── lint  run linters
///     └── test  run tests (deduped)
/// ```
pub fn render_tree(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    for step in plan.steps() {
        out.push_str(&label(step));
        out.push('\n');
        render_children(&step.children, "", &mut out);
    }
    out
}

fn render_children(children: &[PlanStep], prefix: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(out, "{prefix}{branch}{}", label(child));
        render_children(&child.children, &format!("{prefix}{indent}"), out);
    }
}

fn label(step: &PlanStep) -> String {
    let mut s = match step.kind {
        StepKind::Serial => "serial".to_string(),
        StepKind::Parallel => "parallel".to_string(),
        StepKind::Task => {
            let name = step.name.as_deref().unwrap_or("?");
            match step.usage.as_deref() {
                Some(usage) if !usage.is_empty() => format!("{name}  {usage}"),
                _ => name.to_string(),
            }
        }
    };
    if step.hidden {
        s.push_str(" (hidden)");
    }
    if step.deduped {
        s.push_str(" (deduped)");
    }
    s
}

/// One line per task visible from `cwd`: name padded to a column, then usage.
pub fn render_task_list(plan: &ExecutionPlan, cwd: &str) -> String {
    let tasks = plan.visible_tasks(cwd);
    let width = tasks.iter().map(|t| t.name().len()).max().unwrap_or(0);

    let mut out = String::new();
    for task in tasks {
        let _ = writeln!(out, "{:<width$}  {}", task.name(), task.usage());
    }
    out
}

use super::{Step, TaskList, TimeField, Wizard};
use crate::datetime;

/// 一覧で一度に表示する件数。
const VISIBLE_ITEMS: usize = 5;

impl Wizard {
    /// 現在の画面を行ごとの文字列として返す。
    pub fn view(&self) -> Vec<String> {
        match &self.step {
            Step::DateSelect => self.view_date_select(),
            Step::DescriptionInput => vec![
                "Enter Description".to_string(),
                "Provide a brief description of the work done.".to_string(),
                String::new(),
                format!("> {}_", self.draft.description.value()),
                String::new(),
                "Press Enter to continue, or Tab/Shift+Tab to navigate.".to_string(),
            ],
            Step::ProjectSelect(select) => {
                let mut lines = vec![
                    "Select Project".to_string(),
                    "Use arrow keys to navigate, / to search, Enter to select".to_string(),
                    String::new(),
                ];
                let cursor_mark = if select.searching { "_" } else { "" };
                lines.push(format!("Search: {}{}", select.search.value(), cursor_mark));
                lines.push(String::new());

                let filtered = select.filter(&self.projects);
                if self.projects.is_empty() {
                    lines.push("  No projects loaded. Press r to reload.".to_string());
                } else if filtered.is_empty() {
                    lines.push("  No projects match your search.".to_string());
                }
                let selected_id = self.draft.project.as_ref().map(|p| p.id.as_str());
                let names: Vec<String> = filtered
                    .iter()
                    .map(|project| {
                        let mark = if Some(project.id.as_str()) == selected_id { " *" } else { "" };
                        format!("{}{}", project.display_name(), mark)
                    })
                    .collect();
                lines.extend(render_list(&names, select.cursor));
                lines
            }
            Step::TaskSelect { cursor } => self.view_task_select(*cursor),
            Step::TimeInput { focus, errors } => {
                let marker = |field: TimeField| if *focus == field { "_" } else { "" };
                let mut lines = vec![
                    "Enter Time Range".to_string(),
                    "Specify the start and end times for your work.".to_string(),
                    String::new(),
                    format!(
                        "Start Time: {}{}",
                        self.draft.start.value(),
                        marker(TimeField::Start)
                    ),
                ];
                if let Some(error) = &errors.start {
                    lines.push(format!("  ! {}", error));
                }
                lines.push(format!(
                    "End Time:   {}{}",
                    self.draft.end.value(),
                    marker(TimeField::End)
                ));
                if let Some(error) = &errors.end {
                    lines.push(format!("  ! {}", error));
                }
                lines.push(String::new());
                lines.push("Press Enter to continue, Tab to switch fields.".to_string());
                lines
            }
            Step::Confirm { submitting, error } => {
                let mut lines = self.view_summary();
                lines.push(String::new());
                if *submitting {
                    lines.push("Submitting...".to_string());
                } else {
                    let action = if self.is_editing() { "Update" } else { "Create" };
                    lines.push(format!("[ {} ]", action));
                    if let Some(error) = error {
                        lines.push(format!("  ! {}", error));
                    }
                    lines.push(format!(
                        "Press Enter to {}, or Shift+Tab to go back.",
                        action.to_lowercase()
                    ));
                }
                lines
            }
            Step::Complete { .. } => {
                let action = if self.is_editing() { "updated" } else { "created" };
                vec![
                    format!("Time entry {} successfully!", action),
                    "Press [enter] to close.".to_string(),
                ]
            }
        }
    }

    fn view_date_select(&self) -> Vec<String> {
        let mut date = self.draft.date.format("%A, %B %-d, %Y").to_string();
        if self.draft.date.date_naive() == datetime::local_now().date_naive() {
            date.push_str(" (Today)");
        }
        vec![
            "Select Date".to_string(),
            "Use arrow keys to navigate, t for today, Enter to select".to_string(),
            String::new(),
            date,
        ]
    }

    fn view_task_select(&self, cursor: usize) -> Vec<String> {
        let mut lines = vec!["Select Task".to_string()];
        match &self.draft.tasks {
            TaskList::Ready { tasks, .. } => {
                lines.push("Use arrow keys to navigate, Enter to select.".to_string());
                lines.push(String::new());
                let names: Vec<String> = tasks.iter().map(|task| task.name.clone()).collect();
                lines.extend(render_list(&names, cursor));
            }
            TaskList::Failed { error, .. } => {
                lines.push(format!("  ! Failed to load tasks: {}", error));
                lines.push("Press Shift+Tab and select the project again.".to_string());
            }
            TaskList::Loading { .. } | TaskList::NotLoaded => {
                lines.push("Loading tasks...".to_string());
            }
        }
        lines
    }

    fn view_summary(&self) -> Vec<String> {
        let project = self
            .draft
            .project
            .as_ref()
            .map_or_else(|| "(none)".to_string(), |project| project.display_name());
        let task = self
            .draft
            .task
            .as_ref()
            .map_or("No Task", |task| task.name.as_str());
        vec![
            "Confirm Time Entry".to_string(),
            "Please review your time entry details:".to_string(),
            String::new(),
            format!("Date:        {}", self.draft.date.format("%B %-d, %Y")),
            format!(
                "Time:        {} - {}",
                self.draft.start.value(),
                self.draft.end.value()
            ),
            format!("Description: {}", self.draft.description.value()),
            format!("Project:     {}", project),
            format!("Task:        {}", task),
        ]
    }
}

/// カーソル位置を中心に一覧の一部を表示する。
fn render_list(items: &[String], cursor: usize) -> Vec<String> {
    let mut start = cursor.saturating_sub(VISIBLE_ITEMS / 2);
    let end = (start + VISIBLE_ITEMS).min(items.len());
    start = end.saturating_sub(VISIBLE_ITEMS);

    let mut lines = Vec::new();
    if start > 0 {
        lines.push(format!("  ↑ {} more above...", start));
    }
    for (index, item) in items.iter().enumerate().take(end).skip(start) {
        let prefix = if index == cursor { "❯" } else { " " };
        lines.push(format!("{} {}", prefix, item));
    }
    if end < items.len() {
        lines.push(format!("  ↓ {} more below...", items.len() - end));
    }
    lines
}

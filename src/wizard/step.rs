use crate::time_entry::{Project, TimeEntry};
use crate::validation::TimeErrors;

use super::text_input::TextInput;

/// ウィザードの画面の種類。画面の順序で比較できる。
#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepKind {
    DateSelect,
    DescriptionInput,
    ProjectSelect,
    TaskSelect,
    TimeInput,
    Confirm,
    Complete,
}

/// 時刻入力画面でフォーカスしている欄。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeField {
    Start,
    End,
}

impl TimeField {
    pub fn toggle(self) -> Self {
        match self {
            TimeField::Start => TimeField::End,
            TimeField::End => TimeField::Start,
        }
    }
}

/// プロジェクト選択画面の状態。
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectSelect {
    pub search: TextInput,
    pub searching: bool,
    pub cursor: usize,
}

impl ProjectSelect {
    /// 選択中のプロジェクトがあれば、その位置にカーソルを置いた状態を返す。
    pub fn new(projects: &[Project], selected: Option<&Project>) -> Self {
        let cursor = selected
            .and_then(|selected| projects.iter().position(|p| p.id == selected.id))
            .unwrap_or(0);
        Self {
            search: TextInput::new(),
            searching: false,
            cursor,
        }
    }

    /// 検索語に部分一致するプロジェクトを返す。大文字・小文字は区別しない。
    pub fn filter<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        let query = self.search.value().trim().to_lowercase();
        projects
            .iter()
            .filter(|project| query.is_empty() || project.name.to_lowercase().contains(&query))
            .collect()
    }
}

/// 現在の画面と、その画面だけが必要とする状態。
///
/// 画面をまたいで保持する入力内容は`Draft`に置く。
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    DateSelect,
    DescriptionInput,
    ProjectSelect(ProjectSelect),
    TaskSelect { cursor: usize },
    TimeInput { focus: TimeField, errors: TimeErrors },
    Confirm { submitting: bool, error: Option<String> },
    Complete { entry: TimeEntry },
}

impl Step {
    #[cfg(test)]
    pub fn kind(&self) -> StepKind {
        match self {
            Step::DateSelect => StepKind::DateSelect,
            Step::DescriptionInput => StepKind::DescriptionInput,
            Step::ProjectSelect(_) => StepKind::ProjectSelect,
            Step::TaskSelect { .. } => StepKind::TaskSelect,
            Step::TimeInput { .. } => StepKind::TimeInput,
            Step::Confirm { .. } => StepKind::Confirm,
            Step::Complete { .. } => StepKind::Complete,
        }
    }

    pub fn time_input() -> Self {
        Step::TimeInput {
            focus: TimeField::Start,
            errors: TimeErrors::default(),
        }
    }

    pub fn confirm() -> Self {
        Step::Confirm {
            submitting: false,
            error: None,
        }
    }

    /// 入力欄の文字入力を受け付けている間は、画面遷移のキーを無視する。
    pub fn captures_navigation(&self) -> bool {
        matches!(self, Step::ProjectSelect(select) if select.searching)
    }
}

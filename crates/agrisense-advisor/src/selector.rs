//! Task → model handle selection.

use std::collections::HashMap;

use crate::types::TaskCategory;

/// Handle used for any task the table has no entry for.
pub const DEFAULT_MODEL_HANDLE: &str = "gpt-4o-mini";

/// Vision-capable handle for image-backed diagnosis.
pub const VISION_MODEL_HANDLE: &str = "gpt-4o";

/// Immutable task → model handle table, built once at startup.
#[derive(Debug, Clone)]
pub struct ModelTable {
    entries: HashMap<TaskCategory, String>,
    default_handle: String,
}

impl ModelTable {
    /// Empty table; every task resolves to `default_handle`.
    pub fn with_default(default_handle: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            default_handle: default_handle.into(),
        }
    }

    /// Return a table with `task` bound to `handle`.
    pub fn with_override(mut self, task: TaskCategory, handle: impl Into<String>) -> Self {
        self.entries.insert(task, handle.into());
        self
    }

    /// Model handle for a task. Total: unmapped tasks get the default handle.
    pub fn select(&self, task: TaskCategory) -> &str {
        self.entries
            .get(&task)
            .map(String::as_str)
            .unwrap_or(&self.default_handle)
    }

    /// Select by wire name; unknown names get the default handle.
    pub fn select_by_name(&self, task: &str) -> &str {
        match task.parse::<TaskCategory>() {
            Ok(task) => self.select(task),
            Err(_) => &self.default_handle,
        }
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        let mut table = Self::with_default(DEFAULT_MODEL_HANDLE);
        for task in TaskCategory::ALL {
            let handle = match task {
                TaskCategory::DiseaseDetection => VISION_MODEL_HANDLE,
                _ => DEFAULT_MODEL_HANDLE,
            };
            table.entries.insert(task, handle.to_string());
        }
        table
    }
}

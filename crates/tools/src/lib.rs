//! Built-in tool implementations for CodeClaw.
//!
//! Tools give the agent the ability to work inside a project directory:
//! view, create and edit files, run shell commands, keep a todo list,
//! and search the web.
//!
//! All file tools and `bash` share one [`WorkingDir`], so a `cd` issued
//! through `bash` moves where relative paths resolve.

pub mod bash;
pub mod text_editor;
pub mod todo;
pub mod web_search;

use codeclaw_core::tool::ToolRegistry;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use bash::BashTool;
pub use text_editor::{CreateFileTool, StrReplaceEditorTool, ViewFileTool};
pub use todo::{CreateTodoListTool, TodoStore, UpdateTodoListTool};
pub use web_search::WebSearchTool;

/// The working directory shared by the tools of one session.
#[derive(Debug, Clone)]
pub struct WorkingDir(Arc<Mutex<PathBuf>>);

impl WorkingDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::new(Mutex::new(path.into())))
    }

    pub fn get(&self) -> PathBuf {
        self.0
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn set(&self, path: PathBuf) {
        match self.0.lock() {
            Ok(mut current) => *current = path,
            Err(poisoned) => *poisoned.into_inner() = path,
        }
    }

    /// Resolve `path` against the current directory unless it is absolute.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.get().join(candidate)
        }
    }
}

/// Settings for [`default_registry`].
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub linkup_api_key: Option<String>,
    pub bash_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            linkup_api_key: None,
            bash_timeout_secs: 30,
        }
    }
}

/// Create the tool registry with every built-in tool, rooted at `cwd`.
///
/// Registration order is the order the schema is presented to the model.
pub fn default_registry(cwd: impl Into<PathBuf>, settings: ToolSettings) -> ToolRegistry {
    let workdir = WorkingDir::new(cwd);
    let todos = TodoStore::new();

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ViewFileTool::new(workdir.clone())));
    registry.register(Box::new(CreateFileTool::new(workdir.clone())));
    registry.register(Box::new(StrReplaceEditorTool::new(workdir.clone())));
    registry.register(Box::new(BashTool::new(workdir, settings.bash_timeout_secs)));
    registry.register(Box::new(CreateTodoListTool::new(todos.clone())));
    registry.register(Box::new(UpdateTodoListTool::new(todos)));
    registry.register(Box::new(WebSearchTool::new(settings.linkup_api_key)));
    registry
}

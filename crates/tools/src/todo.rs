//! Todo list tools for planning multi-step work.
//!
//! Both tools operate on one [`TodoStore`] shared per session.

use async_trait::async_trait;
use codeclaw_core::error::ToolError;
use codeclaw_core::tool::{Tool, ToolContext, ToolResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn marker(self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::InProgress => "🔄",
            Self::Completed => "✅",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TodoPriority {
    fn marker(self) -> &'static str {
        match self {
            Self::High => "🔴",
            Self::Medium => "🟡",
            Self::Low => "🟢",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default)]
    pub priority: TodoPriority,
}

#[derive(Debug, Deserialize)]
struct TodoUpdate {
    id: String,
    status: Option<TodoStatus>,
    content: Option<String>,
    priority: Option<TodoPriority>,
}

/// In-memory todo list shared by the create and update tools.
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    items: Arc<Mutex<Vec<TodoItem>>>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<TodoItem> {
        self.with_items(|items| items.clone())
    }

    fn with_items<R>(&self, f: impl FnOnce(&mut Vec<TodoItem>) -> R) -> R {
        match self.items.lock() {
            Ok(mut items) => f(&mut items),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn render(items: &[TodoItem]) -> String {
        if items.is_empty() {
            return "No todos".into();
        }
        items
            .iter()
            .map(|item| {
                format!(
                    "{} {} {} ({})",
                    item.status.marker(),
                    item.priority.marker(),
                    item.content,
                    item.id
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_list<T: for<'de> Deserialize<'de>>(
    arguments: &serde_json::Value,
    key: &str,
) -> Result<Vec<T>, ToolError> {
    let value = arguments
        .get(key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid '{key}': {e}")))
}

fn todo_item_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "description": "Unique identifier for the todo item" },
            "content": { "type": "string", "description": "Description of the todo item" },
            "status": {
                "type": "string",
                "enum": ["pending", "in_progress", "completed"],
                "description": "Current status of the todo item"
            },
            "priority": {
                "type": "string",
                "enum": ["high", "medium", "low"],
                "description": "Priority level of the todo item"
            }
        },
        "required": ["id", "content", "status", "priority"]
    })
}

pub struct CreateTodoListTool {
    store: TodoStore,
}

impl CreateTodoListTool {
    pub fn new(store: TodoStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTodoListTool {
    fn name(&self) -> &str {
        "create_todo_list"
    }

    fn description(&self) -> &str {
        "Create a new todo list for planning and tracking tasks"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "description": "Array of todo items",
                    "items": todo_item_schema()
                }
            },
            "required": ["todos"]
        })
    }

    fn plan_restriction(&self) -> Option<&str> {
        Some("Todo list creation")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let todos: Vec<TodoItem> = parse_list(&arguments, "todos")?;
        let rendered = TodoStore::render(&todos);
        self.store.with_items(|items| *items = todos);
        Ok(ToolResult::ok(rendered))
    }
}

pub struct UpdateTodoListTool {
    store: TodoStore,
}

impl UpdateTodoListTool {
    pub fn new(store: TodoStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTodoListTool {
    fn name(&self) -> &str {
        "update_todo_list"
    }

    fn description(&self) -> &str {
        "Update existing todos in the todo list"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "updates": {
                    "type": "array",
                    "description": "Array of todo updates",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "ID of the todo item to update" },
                            "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] },
                            "content": { "type": "string", "description": "New content for the todo item" },
                            "priority": { "type": "string", "enum": ["high", "medium", "low"] }
                        },
                        "required": ["id"]
                    }
                }
            },
            "required": ["updates"]
        })
    }

    fn plan_restriction(&self) -> Option<&str> {
        Some("Todo list update")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let updates: Vec<TodoUpdate> = parse_list(&arguments, "updates")?;

        let outcome = self.store.with_items(|items| {
            for update in &updates {
                if !items.iter().any(|item| item.id == update.id) {
                    return Err(format!("Todo item not found: {}", update.id));
                }
            }
            for update in updates {
                if let Some(item) = items.iter_mut().find(|item| item.id == update.id) {
                    if let Some(status) = update.status {
                        item.status = status;
                    }
                    if let Some(content) = update.content {
                        item.content = content;
                    }
                    if let Some(priority) = update.priority {
                        item.priority = priority;
                    }
                }
            }
            Ok(TodoStore::render(items))
        });

        Ok(match outcome {
            Ok(rendered) => ToolResult::ok(rendered),
            Err(message) => ToolResult::err(message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeclaw_core::confirmation::{AutoApprove, SessionApprovals};
    use codeclaw_core::mode::Mode;

    fn ctx() -> ToolContext {
        ToolContext::new(
            Mode::AutoAcceptOff,
            Arc::new(AutoApprove),
            Arc::new(SessionApprovals::new()),
        )
    }

    fn two_todos() -> serde_json::Value {
        serde_json::json!({
            "todos": [
                {"id": "1", "content": "Read the code", "status": "pending", "priority": "high"},
                {"id": "2", "content": "Write tests", "status": "pending", "priority": "low"}
            ]
        })
    }

    #[tokio::test]
    async fn create_then_update() {
        let store = TodoStore::new();
        let create = CreateTodoListTool::new(store.clone());
        let update = UpdateTodoListTool::new(store.clone());

        let created = create.execute(two_todos(), &ctx()).await.unwrap();
        assert!(created.success);
        assert!(created.output.unwrap().contains("⏳ 🔴 Read the code (1)"));

        let updated = update
            .execute(
                serde_json::json!({"updates": [{"id": "1", "status": "completed"}]}),
                &ctx(),
            )
            .await
            .unwrap();
        assert!(updated.success);
        assert!(updated.output.unwrap().contains("✅ 🔴 Read the code"));
        assert_eq!(store.items()[0].status, TodoStatus::Completed);
        assert_eq!(store.items()[1].status, TodoStatus::Pending);
    }

    #[tokio::test]
    async fn update_unknown_id_changes_nothing() {
        let store = TodoStore::new();
        CreateTodoListTool::new(store.clone())
            .execute(two_todos(), &ctx())
            .await
            .unwrap();

        let result = UpdateTodoListTool::new(store.clone())
            .execute(
                serde_json::json!({"updates": [
                    {"id": "1", "status": "in_progress"},
                    {"id": "9", "status": "completed"}
                ]}),
                &ctx(),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Todo item not found: 9"));
        assert_eq!(store.items()[0].status, TodoStatus::Pending);
    }

    #[tokio::test]
    async fn invalid_status_is_rejected() {
        let tool = CreateTodoListTool::new(TodoStore::new());
        let result = tool
            .execute(
                serde_json::json!({"todos": [{"id": "1", "content": "x", "status": "someday"}]}),
                &ctx(),
            )
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}

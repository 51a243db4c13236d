//! Tool trait and its type-erased adapter

use crate::schema::InputSchema;
use async_trait::async_trait;
use colloquy_core::{OutputSegment, ToolError, ValidationError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TOOL IDENTITY
// ============================================================================

/// Every tool this system knows how to run.
///
/// Model-supplied names are resolved into this enum at the registry
/// boundary; anything that fails to resolve takes the unknown-tool path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolId {
    ListWorks,
    GetWorkContent,
    ListItems,
    GetItemDetails,
    CreateItem,
    UpdateItem,
    RecordTransaction,
    InventoryAnalytics,
}

impl ToolId {
    pub const ALL: [ToolId; 8] = [
        ToolId::ListWorks,
        ToolId::GetWorkContent,
        ToolId::ListItems,
        ToolId::GetItemDetails,
        ToolId::CreateItem,
        ToolId::UpdateItem,
        ToolId::RecordTransaction,
        ToolId::InventoryAnalytics,
    ];

    /// Wire name advertised to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::ListWorks => "list_works",
            ToolId::GetWorkContent => "get_work_content",
            ToolId::ListItems => "list_items",
            ToolId::GetItemDetails => "get_item_details",
            ToolId::CreateItem => "create_item",
            ToolId::UpdateItem => "update_item",
            ToolId::RecordTransaction => "record_transaction",
            ToolId::InventoryAnalytics => "inventory_analytics",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ValidationError::InvalidValue {
            field: "tool".to_string(),
            reason: format!("unknown tool '{}'", s),
        })
    }
}

/// Static description of a tool, as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub id: ToolId,
    pub description: &'static str,
    pub input_schema: InputSchema,
}

impl ToolSpec {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }

    /// JSON Schema object for the tool's input.
    pub fn json_schema(&self) -> Value {
        self.input_schema.to_json_schema()
    }
}

// ============================================================================
// TYPED TOOL
// ============================================================================

/// A typed tool: deserializable input, serializable result, and a
/// formatter turning the result into output segments.
///
/// Domain failures belong in `Output` (usually as a failed
/// [`ToolReply`](crate::ToolReply)); `Err` is reserved for faults the tool
/// cannot describe to the user itself.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn spec(&self) -> ToolSpec;

    async fn invoke(&self, input: Self::Input) -> Result<Self::Output, ToolError>;

    fn format(output: &Self::Output) -> Vec<OutputSegment>;
}

// ============================================================================
// ERASED TOOL
// ============================================================================

/// Result of an erased invocation.
///
/// The structured result is available immediately so it can be recorded;
/// formatting is deferred until [`ToolOutcome::format`] is called.
pub struct ToolOutcome {
    result: Value,
    formatter: Box<dyn FnOnce() -> Vec<OutputSegment> + Send>,
}

impl ToolOutcome {
    pub fn new(
        result: Value,
        formatter: impl FnOnce() -> Vec<OutputSegment> + Send + 'static,
    ) -> Self {
        Self {
            result,
            formatter: Box::new(formatter),
        }
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn format(self) -> Vec<OutputSegment> {
        (self.formatter)()
    }
}

impl fmt::Debug for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolOutcome")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// Object-safe view of a [`Tool`], working on JSON values.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn invoke_json(&self, input: Value) -> Result<ToolOutcome, ToolError>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn spec(&self) -> ToolSpec {
        Tool::spec(self)
    }

    async fn invoke_json(&self, input: Value) -> Result<ToolOutcome, ToolError> {
        let name = Tool::spec(self).name();
        let typed: T::Input =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput {
                tool: name.to_string(),
                reason: e.to_string(),
            })?;

        let output = self.invoke(typed).await?;
        let result = serde_json::to_value(&output).map_err(|e| ToolError::Failed {
            tool: name.to_string(),
            reason: format!("result is not serializable: {}", e),
        })?;

        Ok(ToolOutcome::new(result, move || T::format(&output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde::Deserialize;
    use serde_json::json;

    struct Echo;

    #[derive(Deserialize)]
    struct EchoInput {
        word: String,
    }

    #[derive(Serialize)]
    struct EchoOutput {
        echoed: String,
    }

    #[async_trait]
    impl Tool for Echo {
        type Input = EchoInput;
        type Output = EchoOutput;

        fn spec(&self) -> ToolSpec {
            ToolSpec {
                id: ToolId::ListItems,
                description: "echo",
                input_schema: InputSchema::new()
                    .field("word", FieldSpec::string("word to echo").required()),
            }
        }

        async fn invoke(&self, input: EchoInput) -> Result<EchoOutput, ToolError> {
            Ok(EchoOutput { echoed: input.word })
        }

        fn format(output: &EchoOutput) -> Vec<OutputSegment> {
            vec![OutputSegment::speakable(output.echoed.clone())]
        }
    }

    #[test]
    fn test_tool_id_names_round_trip() {
        for id in ToolId::ALL {
            assert_eq!(id.as_str().parse::<ToolId>(), Ok(id));
        }
        assert!("delete_everything".parse::<ToolId>().is_err());
    }

    #[tokio::test]
    async fn test_erased_invoke_defers_formatting() {
        let tool: &dyn DynTool = &Echo;
        let outcome = tool
            .invoke_json(json!({"word": "hello"}))
            .await
            .expect("invoke should succeed");
        assert_eq!(outcome.result(), &json!({"echoed": "hello"}));
        assert_eq!(outcome.format(), vec![OutputSegment::speakable("hello")]);
    }

    #[tokio::test]
    async fn test_erased_invoke_rejects_mistyped_input() {
        let tool: &dyn DynTool = &Echo;
        let err = tool
            .invoke_json(json!({"word": 42}))
            .await
            .expect_err("mistyped input should fail");
        assert!(matches!(err, ToolError::InvalidInput { tool, .. } if tool == "list_items"));
    }
}

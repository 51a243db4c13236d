//! Assistant profiles
//!
//! A profile bundles what differs between assistants: the system prompt, the
//! tools on offer, how much history the model sees and how tool use is
//! annotated in the stored transcript.

use colloquy_llm::ToolDefinition;
use colloquy_tools::ToolRegistry;
use std::sync::Arc;

const CATALOG_PROMPT: &str = "You are a helpful AI assistant. You provide clear, concise, and accurate information to the user's questions.";

const INVENTORY_PROMPT: &str = "You are Tagore's Inventory Assistant, a helpful and knowledgeable assistant who helps manage a store's inventory.

You have access to the following tools to help manage inventory:
1. list_items - to list inventory items with filtering and sorting options
2. get_item_details - to get detailed information about a specific item
3. create_item - to add a new item to the inventory
4. update_item - to modify an existing item
5. record_transaction - to record sales or purchases
6. inventory_analytics - to summarise stock value, low stock and recent transactions

Always use the tools when appropriate to fulfill user requests about inventory.
For general questions or clarifications about inventory management, you can respond directly.
Be helpful, concise and professional.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// The whole stored conversation.
    Full,
    /// Only the message of the current turn.
    CurrentMessageOnly,
}

#[derive(Debug, Clone)]
pub struct AssistantProfile {
    pub name: &'static str,
    pub system_prompt: String,
    pub registry: Arc<ToolRegistry>,
    pub history_mode: HistoryMode,
    /// Trailing phrase of the transcript note left for each tool used.
    pub annotation_purpose: &'static str,
}

impl AssistantProfile {
    /// General chat over the literary catalog.
    pub fn catalog(registry: Arc<ToolRegistry>) -> Self {
        Self {
            name: "catalog",
            system_prompt: CATALOG_PROMPT.to_string(),
            registry,
            history_mode: HistoryMode::Full,
            annotation_purpose: "to retrieve information",
        }
    }

    /// Inventory management assistant.
    pub fn inventory(registry: Arc<ToolRegistry>) -> Self {
        Self {
            name: "inventory",
            system_prompt: INVENTORY_PROMPT.to_string(),
            registry,
            history_mode: HistoryMode::CurrentMessageOnly,
            annotation_purpose: "for inventory management",
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Transcript note for one tool use.
    pub fn annotation(&self, tool_name: &str) -> String {
        format!(
            "\n\n[Note: Used tool '{}' {}]",
            tool_name, self.annotation_purpose
        )
    }

    /// Tools advertised to the model, in registration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry
            .specs()
            .into_iter()
            .map(|spec| ToolDefinition {
                name: spec.name().to_string(),
                description: spec.description.to_string(),
                input_schema: spec.json_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_test_utils::fixtures::seeded_inventory;
    use colloquy_tools::inventory_registry;

    #[test]
    fn test_annotations_name_the_tool() {
        let profile = AssistantProfile::catalog(Arc::new(ToolRegistry::new()));
        assert_eq!(
            profile.annotation("list_works"),
            "\n\n[Note: Used tool 'list_works' to retrieve information]"
        );
        let inventory = AssistantProfile::inventory(Arc::new(ToolRegistry::new()));
        assert_eq!(
            inventory.annotation("create_item"),
            "\n\n[Note: Used tool 'create_item' for inventory management]"
        );
    }

    #[test]
    fn test_inventory_profile_advertises_every_tool() {
        let registry = inventory_registry(seeded_inventory()).expect("registry");
        let profile = AssistantProfile::inventory(Arc::new(registry));
        let definitions = profile.tool_definitions();

        let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "list_items",
                "get_item_details",
                "create_item",
                "update_item",
                "record_transaction",
                "inventory_analytics"
            ]
        );
        for name in names {
            assert!(profile.system_prompt.contains(name), "{} missing from prompt", name);
        }
        assert_eq!(definitions[0].input_schema["type"], "object");
        assert_eq!(profile.history_mode, HistoryMode::CurrentMessageOnly);
    }
}

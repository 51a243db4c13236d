//! Tool registry
//!
//! Populated once at startup from a hand-written list and read-only
//! afterwards. Lookups go through [`ToolId`] so an unrecognised name is an
//! explicit outcome rather than a missing map entry.

use crate::tool::{DynTool, Tool, ToolId, ToolSpec};
use colloquy_core::ToolError;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of resolving a model-supplied tool name.
#[derive(Clone)]
pub enum ToolLookup {
    Found(Arc<dyn DynTool>),
    Unknown { name: String },
}

impl std::fmt::Debug for ToolLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolLookup::Found(tool) => f.debug_tuple("Found").field(&tool.spec().name()).finish(),
            ToolLookup::Unknown { name } => f.debug_struct("Unknown").field("name", name).finish(),
        }
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn DynTool>>,
    order: Vec<ToolId>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Each [`ToolId`] may be registered once.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), ToolError> {
        let id = Tool::spec(&tool).id;
        if self.tools.contains_key(&id) {
            return Err(ToolError::DuplicateRegistration {
                tool: id.as_str().to_string(),
            });
        }
        self.tools.insert(id, Arc::new(tool));
        self.order.push(id);
        Ok(())
    }

    /// Builder form of [`ToolRegistry::register`].
    pub fn with<T: Tool>(mut self, tool: T) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> ToolLookup {
        let registered = ToolId::from_name(name).and_then(|id| self.tools.get(&id));
        match registered {
            Some(tool) => ToolLookup::Found(Arc::clone(tool)),
            None => ToolLookup::Unknown {
                name: name.to_string(),
            },
        }
    }

    /// Specs in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|id| self.tools.get(id))
            .map(|tool| tool.spec())
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.order.iter().map(ToolId::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

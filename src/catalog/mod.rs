//! Tool catalog: the operations exposed to the AI client.
//!
//! Every tool is declared exactly once in [`TOOL_SPECS`]. Its tier, its input
//! schema and its batched alternative all live on that entry, and the two
//! registry views are derived from it:
//!
//! - **full**: every tool, in declaration order
//! - **restricted**: only [`Tier::Free`] tools; single-diagram tools get an
//!   advisory note pointing at their batched alternative
//!
//! The full view is served when an API token is configured, the restricted
//! view otherwise.

pub mod descriptions;
pub mod schemas;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Validator};
use serde::Serialize;
use serde_json::Value;

use crate::error::CatalogError;

/// Authorization tier of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Listed without a credential.
    Free,
    /// Listed only when a credential is configured.
    Credentialed,
}

/// Declarative entry for one tool.
struct ToolSpec {
    name: &'static str,
    description: &'static str,
    schema: fn() -> Value,
    tier: Tier,
    /// Tool to recommend when several diagrams are rendered at once.
    batch_alternative: Option<&'static str>,
}

const BATCH_RENDER: Option<&str> = Some("renderElements");

const TOOL_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "createFile",
        description: descriptions::CREATE_FILE,
        schema: schemas::create_file,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "renderPrompt",
        description: descriptions::RENDER_PROMPT,
        schema: schemas::render_prompt,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "renderElements",
        description: descriptions::RENDER_ELEMENTS,
        schema: schemas::render_elements,
        tier: Tier::Free,
        batch_alternative: None,
    },
    ToolSpec {
        name: "renderSequenceDiagram",
        description: descriptions::SEQUENCE_DIAGRAM,
        schema: schemas::single_diagram,
        tier: Tier::Free,
        batch_alternative: BATCH_RENDER,
    },
    ToolSpec {
        name: "renderEntityRelationshipDiagram",
        description: descriptions::ENTITY_RELATIONSHIP_DIAGRAM,
        schema: schemas::single_diagram,
        tier: Tier::Free,
        batch_alternative: BATCH_RENDER,
    },
    ToolSpec {
        name: "renderCloudArchitectureDiagram",
        description: descriptions::CLOUD_ARCHITECTURE_DIAGRAM,
        schema: schemas::single_diagram,
        tier: Tier::Free,
        batch_alternative: BATCH_RENDER,
    },
    ToolSpec {
        name: "renderFlowchart",
        description: descriptions::FLOWCHART,
        schema: schemas::single_diagram,
        tier: Tier::Free,
        batch_alternative: BATCH_RENDER,
    },
    ToolSpec {
        name: "renderBpmnDiagram",
        description: descriptions::BPMN_DIAGRAM,
        schema: schemas::single_diagram,
        tier: Tier::Free,
        batch_alternative: BATCH_RENDER,
    },
    ToolSpec {
        name: "listFiles",
        description: descriptions::LIST_FILES,
        schema: schemas::list_files,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "getFile",
        description: descriptions::GET_FILE,
        schema: schemas::get_file,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "updateFile",
        description: descriptions::UPDATE_FILE,
        schema: schemas::update_file,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "archiveFile",
        description: descriptions::ARCHIVE_FILE,
        schema: schemas::archive_file,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "listDiagrams",
        description: descriptions::LIST_DIAGRAMS,
        schema: schemas::list_diagrams,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "getDiagram",
        description: descriptions::GET_DIAGRAM,
        schema: schemas::get_diagram,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "createDiagram",
        description: descriptions::CREATE_DIAGRAM,
        schema: schemas::create_diagram,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "updateDiagram",
        description: descriptions::UPDATE_DIAGRAM,
        schema: schemas::update_diagram,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
    ToolSpec {
        name: "deleteDiagram",
        description: descriptions::DELETE_DIAGRAM,
        schema: schemas::delete_diagram,
        tier: Tier::Credentialed,
        batch_alternative: None,
    },
];

/// Returns the advisory note appended to tools with a batched alternative.
#[must_use]
pub fn advisory_note(alternative: &str) -> String {
    format!("\n\nNote: For rendering multiple diagrams at once, prefer the `{alternative}` tool.")
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// One tool as served by a registry view.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: &'static str,
    description: String,
    input_schema: Value,
    tier: Tier,
    batch_alternative: Option<&'static str>,
    validator: Arc<Validator>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    fn compile(spec: &ToolSpec) -> Result<Self, CatalogError> {
        let input_schema = (spec.schema)();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&input_schema)
            .map_err(|e| CatalogError::InvalidSchema {
                tool: spec.name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name: spec.name,
            description: spec.description.to_string(),
            input_schema,
            tier: spec.tier,
            batch_alternative: spec.batch_alternative,
            validator: Arc::new(validator),
        })
    }

    /// Tool name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Description as served by this view.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// JSON Schema of the tool input.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Authorization tier.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Checks tool arguments against the input schema.
    ///
    /// # Errors
    ///
    /// Returns every violation, joined into one message.
    pub fn validate(&self, arguments: &Value) -> Result<(), String> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|e| e.to_string())
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations.join("; "))
        }
    }

    /// Projects this tool onto its `tools/list` entry.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// An ordered set of tools with constant-time lookup by name.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    fn from_tools(tools: Vec<ToolDescriptor>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name, i))
            .collect();
        Self { tools, index }
    }

    /// Looks up a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ToolNotFound`] if this view has no such tool.
    pub fn get(&self, name: &str) -> Result<&ToolDescriptor, CatalogError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| CatalogError::ToolNotFound(name.to_string()))
    }

    /// Tools in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Number of tools in this view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if this view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the `tools/list` projection of this view.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }
}

/// Both registry views, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    full: ToolRegistry,
    restricted: ToolRegistry,
}

impl Catalog {
    /// Compiles every declared tool and derives both views.
    ///
    /// # Errors
    ///
    /// Returns an error if a declared schema does not compile.
    pub fn load() -> Result<Self, CatalogError> {
        let tools = TOOL_SPECS
            .iter()
            .map(ToolDescriptor::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let full = ToolRegistry::from_tools(tools);
        let restricted = restrict(&full);

        tracing::debug!(
            full = full.len(),
            restricted = restricted.len(),
            "Tool catalog loaded"
        );

        Ok(Self { full, restricted })
    }

    /// Every tool.
    #[must_use]
    pub const fn full(&self) -> &ToolRegistry {
        &self.full
    }

    /// Free tools, with advisory notes.
    #[must_use]
    pub const fn restricted(&self) -> &ToolRegistry {
        &self.restricted
    }

    /// Authorization tier of a declared tool.
    #[must_use]
    pub fn tier_of(&self, name: &str) -> Option<Tier> {
        self.full.get(name).ok().map(ToolDescriptor::tier)
    }

    /// Selects the view for a caller with or without a credential.
    #[must_use]
    pub const fn view(&self, credentialed: bool) -> &ToolRegistry {
        if credentialed {
            &self.full
        } else {
            &self.restricted
        }
    }
}

/// Derives the restricted view from the full one.
fn restrict(full: &ToolRegistry) -> ToolRegistry {
    let is_free = |name: &str| {
        full.get(name)
            .map(|tool| tool.tier == Tier::Free)
            .unwrap_or(false)
    };

    let tools = full
        .iter()
        .filter(|tool| tool.tier == Tier::Free)
        .map(|tool| {
            let mut tool = tool.clone();
            if let Some(alternative) = tool.batch_alternative.filter(|alt| is_free(*alt)) {
                tool.description.push_str(&advisory_note(alternative));
            }
            tool
        })
        .collect();

    ToolRegistry::from_tools(tools)
}

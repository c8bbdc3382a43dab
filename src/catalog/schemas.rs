//! Input schemas for every tool.
//!
//! Each function returns the JSON Schema (draft-07) projection of one
//! operation's input contract. Render tools share [`render_options`] and
//! accept additional properties; file and diagram tools are closed objects.

use serde_json::{json, Map, Value};

/// JSON Schema dialect declared by every input schema.
pub const SCHEMA_DIALECT: &str = "http://json-schema.org/draft-07/schema#";

/// Diagram types the rendering API accepts.
pub const DIAGRAM_TYPES: [&str; 5] = [
    "sequence-diagram",
    "entity-relationship-diagram",
    "cloud-architecture-diagram",
    "flowchart-diagram",
    "bpmn-diagram",
];

/// Link sharing levels for created files.
pub const LINK_ACCESS: [&str; 6] = [
    "no-link-access",
    "anyone-with-link-can-edit",
    "publicly-viewable",
    "publicly-editable",
    "sso-readable",
    "sso-editable",
];

/// Output image formats.
pub const FILE_FORMATS: [&str; 2] = ["png", "jpeg"];

const COLOR_MODES: [&str; 3] = ["pastel", "bold", "outline"];
const STYLE_MODES: [&str; 3] = ["plain", "shadow", "watercolor"];
const TYPEFACES: [&str; 3] = ["rough", "clean", "mono"];
const DIRECTIONS: [&str; 4] = ["up", "down", "left", "right"];
const THEMES: [&str; 2] = ["light", "dark"];
const AI_MODES: [&str; 2] = ["standard", "premium"];

fn string_enum(values: &[&str]) -> Value {
    json!({ "type": "string", "enum": values })
}

fn described(mut schema: Value, description: &str) -> Value {
    if let Some(obj) = schema.as_object_mut() {
        obj.insert("description".to_string(), Value::from(description));
    }
    schema
}

fn string_field(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

/// Builds an object schema from a property list.
fn object(properties: Map<String, Value>, required: &[&str], open: bool) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": open,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Marks a schema as a top-level tool input.
fn root(mut schema: Value) -> Value {
    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$schema".to_string(), Value::from(SCHEMA_DIALECT));
    }
    schema
}

fn props<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect()
}

fn file_options() -> Value {
    object(
        props([
            (
                "create",
                json!({
                    "type": "boolean",
                    "description": "Whether to create a new file. Defaults to false."
                }),
            ),
            (
                "linkAccess",
                described(
                    string_enum(&LINK_ACCESS),
                    "Optional link sharing access level. Defaults to using team config.",
                ),
            ),
        ]),
        &[],
        false,
    )
}

/// Rendering options shared by every render tool.
#[must_use]
pub fn render_options() -> Map<String, Value> {
    props([
        (
            "imageQuality",
            json!({
                "type": "number",
                "enum": [1, 2, 3],
                "description": "Image resolution multiplier (1x, 2x, or 3x)."
            }),
        ),
        (
            "background",
            json!({
                "type": "boolean",
                "description": "Whether to include a solid background."
            }),
        ),
        ("theme", string_enum(&THEMES)),
        ("format", string_enum(&FILE_FORMATS)),
        ("typeface", string_enum(&TYPEFACES)),
        ("colorMode", string_enum(&COLOR_MODES)),
        ("styleMode", string_enum(&STYLE_MODES)),
        (
            "direction",
            described(
                string_enum(&DIRECTIONS),
                "Applies to flowcharts and architecture diagrams only.",
            ),
        ),
        (
            "returnImageAsFile",
            json!({
                "type": "boolean",
                "description": "If true, streams the image as a file to the client, with no other response."
            }),
        ),
        ("fileOptions", file_options()),
    ])
}

fn with_render_options<const N: usize>(extra: [(&str, Value); N]) -> Map<String, Value> {
    let mut properties = render_options();
    properties.extend(props(extra));
    properties
}

fn diagram_element(with_position: bool) -> Value {
    let mut properties = props([
        ("type", json!({ "type": "string", "const": "diagram" })),
        ("diagramType", string_enum(&DIAGRAM_TYPES)),
        ("code", json!({ "type": "string" })),
    ]);
    if with_position {
        properties.insert("x".to_string(), json!({ "type": "number" }));
        properties.insert("y".to_string(), json!({ "type": "number" }));
    }
    object(properties, &["type", "diagramType", "code"], false)
}

/// Input for the single-diagram render tools.
#[must_use]
pub fn single_diagram() -> Value {
    root(object(
        with_render_options([(
            "code",
            string_field("The diagram code in Eraser syntax."),
        )]),
        &["code"],
        true,
    ))
}

/// Input for `renderElements`.
#[must_use]
pub fn render_elements() -> Value {
    root(object(
        with_render_options([(
            "elements",
            json!({ "type": "array", "items": diagram_element(true) }),
        )]),
        &["elements"],
        true,
    ))
}

/// Input for `renderPrompt`.
#[must_use]
pub fn render_prompt() -> Value {
    let git = object(
        props([
            ("repoName", string_field("Name of the repository.")),
            ("orgName", string_field("Name of the organization.")),
        ]),
        &["repoName", "orgName"],
        false,
    );
    root(object(
        with_render_options([
            ("text", json!({ "type": "string" })),
            ("diagramType", json!({ "type": "string" })),
            (
                "priorRequestId",
                string_field("Allows editing a previously created diagram."),
            ),
            ("attachments", json!({ "type": "array", "items": {} })),
            (
                "contextId",
                string_field("ID of an AI preset belonging to the team."),
            ),
            ("mode", string_enum(&AI_MODES)),
            ("git", git),
        ]),
        &["text"],
        true,
    ))
}

/// Input for `createFile`.
#[must_use]
pub fn create_file() -> Value {
    root(object(
        props([
            ("title", string_field("Title for the file.")),
            (
                "document",
                string_field(
                    "Markdown content for the document. Supports diagram code blocks \
                     (e.g., ```flowchart-diagram) which are converted to embedded diagrams.",
                ),
            ),
            (
                "elements",
                json!({
                    "type": "array",
                    "items": diagram_element(false),
                    "description": "Standalone diagram elements using diagram DSL syntax. Will be added to canvas."
                }),
            ),
            (
                "linkAccess",
                described(
                    string_enum(&LINK_ACCESS),
                    "Optional link sharing access level. Defaults to using team config.",
                ),
            ),
        ]),
        &[],
        false,
    ))
}

/// Input for `listFiles`.
#[must_use]
pub fn list_files() -> Value {
    root(object(
        props([
            (
                "limit",
                json!({
                    "type": "number",
                    "description": "Maximum number of files to return (1-500). Defaults to 100."
                }),
            ),
            (
                "cursor",
                string_field("Cursor for pagination. Use nextCursor from a previous response."),
            ),
            ("folderId", string_field("Filter files by folder ID.")),
            (
                "sort",
                string_field(
                    "Sort field with optional \"-\" prefix for descending. Examples: \
                     \"-updatedAt\" (default), \"createdAt\". Valid fields: createdAt, updatedAt.",
                ),
            ),
            (
                "author",
                string_field("Filter by author (user ID or email address)."),
            ),
        ]),
        &[],
        false,
    ))
}

/// Input for `getFile`.
#[must_use]
pub fn get_file() -> Value {
    root(object(
        props([("fileId", string_field("The ID of the file to retrieve."))]),
        &["fileId"],
        false,
    ))
}

/// Input for `updateFile`.
#[must_use]
pub fn update_file() -> Value {
    root(object(
        props([
            ("fileId", string_field("The ID of the file to update.")),
            ("title", string_field("New title for the file.")),
            ("folderId", string_field("Folder ID to move the file into.")),
            (
                "document",
                string_field(
                    "Markdown content for the document. Replaces existing document content. \
                     Supports diagram code blocks (e.g., ```flowchart-diagram). To edit existing \
                     diagram embeds, use the updateDiagram tool.",
                ),
            ),
            (
                "linkAccess",
                described(
                    string_enum(&LINK_ACCESS),
                    "Optional link sharing access level.",
                ),
            ),
        ]),
        &["fileId"],
        false,
    ))
}

/// Input for `archiveFile`.
#[must_use]
pub fn archive_file() -> Value {
    root(object(
        props([("fileId", string_field("The ID of the file to archive."))]),
        &["fileId"],
        false,
    ))
}

/// Input for `listDiagrams`.
#[must_use]
pub fn list_diagrams() -> Value {
    root(object(
        props([(
            "fileId",
            string_field("The ID of the file containing the diagrams."),
        )]),
        &["fileId"],
        false,
    ))
}

fn diagram_ref(action: &str) -> Map<String, Value> {
    props([
        (
            "fileId",
            string_field("The ID of the file containing the diagram."),
        ),
        (
            "diagramId",
            string_field(&format!("The ID of the diagram to {action}.")),
        ),
    ])
}

/// Input for `getDiagram`.
#[must_use]
pub fn get_diagram() -> Value {
    root(object(diagram_ref("retrieve"), &["fileId", "diagramId"], false))
}

/// Input for `createDiagram`.
#[must_use]
pub fn create_diagram() -> Value {
    root(object(
        props([
            (
                "fileId",
                string_field("The ID of the file to add the diagram to."),
            ),
            (
                "diagramType",
                described(string_enum(&DIAGRAM_TYPES), "The type of diagram to create."),
            ),
            (
                "code",
                string_field(
                    "The diagram code in Eraser syntax. If omitted, creates an empty diagram.",
                ),
            ),
        ]),
        &["fileId", "diagramType"],
        false,
    ))
}

/// Input for `updateDiagram`.
#[must_use]
pub fn update_diagram() -> Value {
    let mut properties = diagram_ref("update");
    properties.insert(
        "code".to_string(),
        string_field("The new diagram code in Eraser syntax."),
    );
    root(object(properties, &["fileId", "diagramId", "code"], false))
}

/// Input for `deleteDiagram`.
#[must_use]
pub fn delete_diagram() -> Value {
    root(object(diagram_ref("delete"), &["fileId", "diagramId"], false))
}

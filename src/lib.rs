//! eraser-mcp: MCP gateway for Eraser diagram rendering
//!
//! This library implements a stdio Model Context Protocol server that
//! advertises the Eraser diagram tools and relays tool calls to the remote
//! rendering API.
//!
//! # Architecture
//!
//! The gateway holds no diagram logic of its own:
//!
//! - **Catalog**: static tool definitions and their JSON Schemas, with a
//!   restricted view for sessions without an API token
//! - **Transport**: newline-delimited JSON-RPC 2.0 on stdin/stdout
//! - **Forwarder**: one authenticated HTTP POST per tool call
//! - **Artifact cache**: rendered images saved under the output directory
//!
//! # Modules
//!
//! - [`catalog`] — Tool definitions and argument validation
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation

pub mod catalog;
pub mod config;
pub mod error;
pub mod mcp;

//! Model Context Protocol (MCP) gateway implementation.
//!
//! Exposes the Eraser diagram tools to AI assistants over stdio transport
//! using JSON-RPC 2.0 messages. Tool calls are relayed to the remote API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         MCP Gateway                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│  Forwarder   │───▶ HTTP
//! │   │   (stdio)   │    │  (dispatch) │    │  (upstream)  │     │
//! │   └─────────────┘    └─────────────┘    └──────────────┘     │
//! │          ▲                  │                  │             │
//! │          │                  ▼                  ▼             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐     │
//! │   │   Writer    │◀───│   Catalog   │    │   Artifact   │     │
//! │   │    task     │    │ (validation)│    │    cache     │     │
//! │   └─────────────┘    └─────────────┘    └──────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod artifact;
pub mod forwarder;
pub mod protocol;
pub mod server;
pub mod transport;

pub use artifact::ArtifactCache;
pub use forwarder::{HttpUpstream, Upstream};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{spawn_writer, LineReader, OutboundSink};

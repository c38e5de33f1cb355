//! Error types for routeplanner.
//!
//! Every per-call failure is a `RouteError`. The tool router turns these into
//! error-flagged tool results, so only `Configuration` ever ends the process.

use thiserror::Error;

/// All error types that can occur while serving a tool call.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Missing or placeholder API key, unreadable config (fatal at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tool name not present in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The provider answered but found no route
    #[error("No route found: {0}")]
    NoRouteFound(String),

    /// Transport, auth, quota or malformed-response failure from the provider
    #[error("Provider error: {0}")]
    Provider(String),

    /// Cost estimation requested without a resolvable route
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Route data that cannot be classified (e.g. zero duration)
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Tool arguments that fail validation
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for routeplanner operations
pub type Result<T> = std::result::Result<T, RouteError>;

//! Protocol-level constants.

/// Current version of the transport crates (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC protocol tag carried in every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision of November 2024.
pub const PROTOCOL_VERSION_2024_11_05: &str = "2024-11-05";

/// Newest protocol revision this transport speaks.
pub const LATEST_PROTOCOL_VERSION: &str = PROTOCOL_VERSION_2024_11_05;

/// MCP method names.
pub mod methods {
    /// Lifecycle handshake request.
    pub const INITIALIZE: &str = "initialize";
    /// Sent by the client once initialization completes.
    pub const NOTIFICATION_INITIALIZED: &str = "notifications/initialized";
    /// Liveness check, valid in both directions.
    pub const PING: &str = "ping";
    /// Progress update for a long-running request.
    pub const NOTIFICATION_PROGRESS: &str = "notifications/progress";

    /// List available tools.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Invoke a tool.
    pub const TOOLS_CALL: &str = "tools/call";
    /// Server tool list changed.
    pub const NOTIFICATION_TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

    /// List resources.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Read a resource.
    pub const RESOURCES_READ: &str = "resources/read";
    /// Server resource list changed.
    pub const NOTIFICATION_RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    /// A subscribed resource was updated.
    pub const NOTIFICATION_RESOURCES_UPDATED: &str = "notifications/resources/updated";
    /// List resource templates.
    pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
    /// Subscribe to resource updates.
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    /// Cancel a resource subscription.
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";

    /// List prompts.
    pub const PROMPT_LIST: &str = "prompts/list";
    /// Fetch a prompt.
    pub const PROMPT_GET: &str = "prompts/get";
    /// Server prompt list changed.
    pub const NOTIFICATION_PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";

    /// Argument completion.
    pub const COMPLETION_COMPLETE: &str = "completion/complete";

    /// Adjust server log verbosity.
    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
    /// Server log line.
    pub const NOTIFICATION_MESSAGE: &str = "notifications/message";

    /// Server asks the client for its roots.
    pub const ROOTS_LIST: &str = "roots/list";
    /// Client root list changed.
    pub const NOTIFICATION_ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";

    /// Server asks the client to sample an LLM.
    pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";

    /// Server asks the client to collect user input.
    pub const ELICITATION_CREATE: &str = "elicitation/create";
}

/// Standard JSON-RPC error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

pub mod client;
pub mod types;

pub use client::GraphClient;

/// OAuth scope for the client-credentials grant
pub const SCOPE_GRAPH: &str = "https://graph.microsoft.com/.default";

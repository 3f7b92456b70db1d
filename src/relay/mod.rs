pub mod client;
pub mod log;
pub mod soap;

pub use client::{Attachment, RelayClient, RelayMessage, SendOutcome};
pub use log::{MemorySendLog, SendLog, SendLogRecord};

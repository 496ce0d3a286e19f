//! Inbound webhook: decode pushed updates and serve them over HTTP.

pub mod ingest;
pub mod path;
pub mod server;

pub use ingest::WebhookIngest;
pub use path::{webhook_path, webhook_url};
pub use server::{router, serve};

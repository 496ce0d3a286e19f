//! Bot API client: thin per-method wrappers over the shared transport, plus
//! long polling.

pub mod bot;
pub mod polling;

pub use bot::Bot;
pub use polling::run_polling;

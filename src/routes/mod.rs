//! Router configuration.

mod api;
mod ws;

pub use api::create_api_router;
pub use ws::create_chat_router;

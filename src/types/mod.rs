mod api;
mod language;

pub use api::{frame_delta, ChatRequest, ErrorBody, Message, Role};
pub use language::{Language, LanguageTexts};

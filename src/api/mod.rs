pub mod client;
pub mod error;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use client::{ByteStream, ChatClient, ChatTransport};
pub use error::{ChatError, DecodeError};
pub use stream::{DecodedLine, DecoderLimits, StreamParser};

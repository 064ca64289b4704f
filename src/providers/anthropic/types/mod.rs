pub mod request;
pub mod stream;

pub use request::MessagesRequest;
pub use stream::{DeltaEvent, MessageDeltaEvent, StreamError, StreamEvent};

pub mod correlation;
pub mod error;
pub mod messaging;
pub mod redact;

pub use correlation::{RequestSlots, Slot};
pub use error::PipelineError;
pub use messaging::{Dispatch, Envelope, Mailbox, Port, Responder, channel};

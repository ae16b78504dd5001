pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod sink;
pub mod traits;
pub mod types;

pub use channel::StayBus;
pub use error::StayError;
pub use event::{PresenceEvent, Transition};
pub use message::{AnnounceTrigger, Message};
pub use sink::{LogSink, RecordingSink, SentMessage};
pub use traits::{Component, MessagingSink};
pub use types::{Card, RankedEntry, UserProfile};

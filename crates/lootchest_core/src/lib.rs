pub use glam;
pub use tokio;

pub mod camera;
pub mod events;
pub mod sizes;
pub mod time;
pub mod transform;

pub use events::{ChestPoints, ChestSelection, EventBus, EventReceiver, InboundEvent, OutboundEvent};
pub use sizes::Sizes;
pub use time::{FixedStep, Time};

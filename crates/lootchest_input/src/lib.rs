pub mod actions;
pub mod logical;
pub mod physical;

pub use logical::{ActionId, AxisId, ButtonPhase, InputMap};
pub use physical::{DeviceKind, InputState, MouseAxis, MouseButtonId, PhysicalInputId};

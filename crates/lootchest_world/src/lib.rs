pub mod camera;
pub mod config;
pub mod error;
pub mod experience;
pub mod loot_chest;
pub mod music;
pub mod trapdoor;
pub mod world;

pub use camera::{CameraDrive, CameraRig, OrbitControls};
pub use config::ExperienceConfig;
pub use error::{ChestError, ExperienceError};
pub use experience::Experience;
pub use loot_chest::{AnimationSet, Callback, ChestState, Highlight, LootChest};
pub use music::{AudioBackend, LogAudio, Music};
pub use trapdoor::Trapdoor;
pub use world::{World, WorldParts};

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc::UnboundedSender;

use crate::AssetError;
use crate::assets::AssetRef;
use crate::manifest::{AssetKind, ManifestEntry};
use crate::resources::ResourceItem;

pub mod gltf_parser;
pub mod texture_parser;

// Sent from the IO runtime back to the frame thread.
#[derive(Debug)]
pub enum AssetWorkerMessage {
    Loaded { name: String, item: ResourceItem },
    Failed { name: String, error: AssetError },
}

#[derive(Clone)]
pub struct AssetServer {
    event_sender: UnboundedSender<AssetWorkerMessage>,
    io_handle: TokioHandle,
    root: PathBuf,
}

impl AssetServer {
    pub fn new(
        event_sender: UnboundedSender<AssetWorkerMessage>,
        io_handle: TokioHandle,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            event_sender,
            io_handle,
            root: root.into(),
        }
    }

    /// Starts loading `entry` in the background. The outcome arrives as one
    /// [`AssetWorkerMessage`] on the server's channel.
    pub fn load(&self, entry: &ManifestEntry) {
        let entry = entry.clone();
        let root = self.root.clone();
        let sender = self.event_sender.clone();

        self.io_handle.spawn(async move {
            log::debug!("loading asset '{}' ({:?})", entry.name, entry.kind);
            let name = entry.name.clone();
            let result = tokio::task::spawn_blocking(move || load_entry(&root, &entry)).await;

            let message = match result {
                Ok(Ok(item)) => AssetWorkerMessage::Loaded { name, item },
                Ok(Err(error)) => AssetWorkerMessage::Failed { name, error },
                Err(e) => AssetWorkerMessage::Failed {
                    name,
                    error: AssetError::Worker(e.to_string()),
                },
            };
            // The receiver is gone once the experience is torn down.
            let _ = sender.send(message);
        });
    }
}

/// Blocking load of a single manifest entry.
pub fn load_entry(root: &std::path::Path, entry: &ManifestEntry) -> Result<ResourceItem, AssetError> {
    let paths = entry.resolve(root);
    let expect = |expected: usize| {
        if paths.len() == expected {
            Ok(())
        } else {
            Err(AssetError::PathCount {
                name: entry.name.clone(),
                expected,
                actual: paths.len(),
            })
        }
    };

    match entry.kind {
        AssetKind::Texture => {
            expect(1)?;
            let texture = texture_parser::parse_texture(&paths[0])?;
            Ok(ResourceItem::Texture(AssetRef::new(texture)))
        }
        AssetKind::CubeTexture => {
            expect(6)?;
            let cube = texture_parser::parse_cube_texture(&paths)?;
            Ok(ResourceItem::CubeTexture(Arc::new(cube)))
        }
        AssetKind::GltfModel | AssetKind::GlbModel => {
            expect(1)?;
            let model = gltf_parser::parse_gltf(&paths[0])?;
            Ok(ResourceItem::Model(Arc::new(model)))
        }
    }
}

//! Manifest-driven loader that owns every loaded asset by name.
//!
//! Loads run on the IO runtime; results are queued and applied on the frame
//! thread by [`Resources::poll`]. Once every manifest entry has been delivered
//! the ready signal fires, exactly once, for every subscriber.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle as TokioHandle;
use tokio::sync::{mpsc, oneshot};

use crate::AssetError;
use crate::asset_server::{AssetServer, AssetWorkerMessage};
use crate::assets::AssetRef;
use crate::manifest::ResourceManifest;
use crate::material::{CubeTextureData, TextureData};
use crate::model::ModelData;

#[derive(Clone, Debug)]
pub enum ResourceItem {
    Texture(AssetRef<TextureData>),
    CubeTexture(Arc<CubeTextureData>),
    Model(Arc<ModelData>),
}

pub struct Resources {
    manifest: ResourceManifest,
    items: HashMap<String, ResourceItem>,
    failures: Vec<(String, String)>,
    receiver: Option<mpsc::UnboundedReceiver<AssetWorkerMessage>>,
    ready_subscribers: Vec<oneshot::Sender<()>>,
    ready: bool,
}

impl Resources {
    /// Creates the table without starting any load. Items are delivered
    /// through [`Resources::source_loaded`].
    pub fn new(manifest: ResourceManifest) -> Self {
        if let Some(name) = manifest.first_duplicate() {
            log::warn!("manifest lists '{name}' more than once; only the first load counts");
        }
        let ready = manifest.is_empty();
        Self {
            manifest,
            items: HashMap::new(),
            failures: Vec::new(),
            receiver: None,
            ready_subscribers: Vec::new(),
            ready,
        }
    }

    /// Creates the table and starts loading every entry under `root`.
    pub fn load(manifest: ResourceManifest, root: impl Into<PathBuf>, io_handle: TokioHandle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let server = AssetServer::new(sender, io_handle, root);

        log::info!("loading {} assets", manifest.len());
        for entry in manifest.entries() {
            server.load(entry);
        }

        let mut resources = Self::new(manifest);
        resources.receiver = Some(receiver);
        resources
    }

    /// Resolves once every manifest entry has loaded. Subscribing after that
    /// point resolves immediately.
    pub fn on_ready(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.ready {
            let _ = tx.send(());
        } else {
            self.ready_subscribers.push(tx);
        }
        rx
    }

    /// Applies finished background loads. Returns `true` if this call made
    /// the table ready.
    pub fn poll(&mut self) -> bool {
        let Some(receiver) = self.receiver.as_mut() else {
            return false;
        };

        let mut messages = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            messages.push(message);
        }

        let mut became_ready = false;
        for message in messages {
            match message {
                AssetWorkerMessage::Loaded { name, item } => {
                    became_ready |= self.source_loaded(name, item);
                }
                AssetWorkerMessage::Failed { name, error } => self.source_failed(name, error),
            }
        }
        if self.ready {
            self.receiver = None;
        }
        became_ready
    }

    /// Records a loaded item. Returns `true` if it completed the table.
    pub fn source_loaded(&mut self, name: impl Into<String>, item: ResourceItem) -> bool {
        let name = name.into();
        if self.ready {
            log::warn!("asset '{name}' arrived after resources were ready; ignored");
            return false;
        }
        if !self.manifest.contains(&name) {
            log::warn!("asset '{name}' is not in the manifest; ignored");
            return false;
        }
        if self.items.contains_key(&name) {
            log::warn!("asset '{name}' delivered twice; keeping the first");
            return false;
        }

        log::debug!("asset '{name}' loaded");
        self.items.insert(name, item);

        if self.items.len() == self.manifest.unique_len() {
            self.ready = true;
            log::info!("all {} assets loaded", self.items.len());
            for subscriber in self.ready_subscribers.drain(..) {
                let _ = subscriber.send(());
            }
            return true;
        }
        false
    }

    /// A failed entry is never counted, so the table never becomes ready.
    pub fn source_failed(&mut self, name: impl Into<String>, error: AssetError) {
        let name = name.into();
        log::error!("failed to load asset '{name}': {error}");
        self.failures.push((name, error.to_string()));
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn loaded(&self) -> usize {
        self.items.len()
    }

    pub fn to_load(&self) -> usize {
        self.manifest.unique_len()
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    /// `(name, message)` for every entry that failed to load.
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    pub fn get(&self, name: &str) -> Option<&ResourceItem> {
        self.items.get(name)
    }

    pub fn model(&self, name: &str) -> Option<Arc<ModelData>> {
        match self.items.get(name) {
            Some(ResourceItem::Model(model)) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<AssetRef<TextureData>> {
        match self.items.get(name) {
            Some(ResourceItem::Texture(texture)) => Some(texture.clone()),
            _ => None,
        }
    }

    pub fn cube_texture(&self, name: &str) -> Option<Arc<CubeTextureData>> {
        match self.items.get(name) {
            Some(ResourceItem::CubeTexture(cube)) => Some(Arc::clone(cube)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{AssetKind, AssetPath, ManifestEntry};

    fn manifest(names: &[&str]) -> ResourceManifest {
        ResourceManifest::new(
            names
                .iter()
                .map(|n| ManifestEntry::new(*n, AssetKind::GlbModel, AssetPath::Single(format!("/{n}.glb"))))
                .collect(),
        )
    }

    fn model() -> ResourceItem {
        ResourceItem::Model(Arc::new(ModelData::new()))
    }

    #[test]
    fn ready_fires_once_after_every_entry() {
        let mut resources = Resources::new(manifest(&["a", "b"]));
        let mut ready = resources.on_ready();

        assert!(!resources.source_loaded("a", model()));
        assert!(ready.try_recv().is_err());
        assert!(resources.source_loaded("b", model()));
        assert!(ready.try_recv().is_ok());

        assert!(!resources.source_loaded("b", model()));
        assert_eq!(resources.loaded(), 2);
    }

    #[test]
    fn duplicate_delivery_is_not_counted() {
        let mut resources = Resources::new(manifest(&["a", "b"]));
        resources.source_loaded("a", model());
        resources.source_loaded("a", model());
        assert_eq!(resources.loaded(), 1);
        assert!(!resources.is_ready());
    }

    #[test]
    fn repeated_manifest_name_still_becomes_ready() {
        let mut resources = Resources::new(manifest(&["a", "b", "a"]));
        let mut ready = resources.on_ready();
        assert_eq!(resources.to_load(), 2);

        resources.source_loaded("a", model());
        assert!(resources.source_loaded("b", model()));
        assert!(ready.try_recv().is_ok());
    }

    #[test]
    fn failures_keep_the_table_unready() {
        let mut resources = Resources::new(manifest(&["a", "b"]));
        resources.source_loaded("a", model());
        resources.source_failed("b", AssetError::Worker("boom".into()));

        assert!(!resources.is_ready());
        assert_eq!(resources.failures().len(), 1);
        assert_eq!(resources.failures()[0].0, "b");
    }

    #[test]
    fn late_subscriber_resolves_immediately() {
        let mut resources = Resources::new(manifest(&["a"]));
        resources.source_loaded("a", model());
        assert!(resources.on_ready().try_recv().is_ok());
    }

    #[test]
    fn empty_manifest_is_ready() {
        let mut resources = Resources::new(ResourceManifest::default());
        assert!(resources.is_ready());
        assert!(resources.on_ready().try_recv().is_ok());
    }

    #[test]
    fn typed_lookup_checks_kind() {
        let mut resources = Resources::new(manifest(&["chest"]));
        resources.source_loaded("chest", model());
        assert!(resources.model("chest").is_some());
        assert!(resources.texture("chest").is_none());
        assert!(resources.model("missing").is_none());
    }

    #[tokio::test]
    async fn background_load_reports_missing_files() {
        let mut resources = Resources::load(
            manifest(&["ghost"]),
            std::env::temp_dir().join("lootchest-missing"),
            TokioHandle::current(),
        );

        for _ in 0..200 {
            resources.poll();
            if !resources.failures().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(resources.failures().len(), 1);
        assert!(!resources.is_ready());
    }
}

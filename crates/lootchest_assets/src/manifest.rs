use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::AssetError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Texture,
    CubeTexture,
    GltfModel,
    GlbModel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetPath {
    Single(String),
    Many(Vec<String>),
}

impl AssetPath {
    pub fn as_slice(&self) -> &[String] {
        match self {
            AssetPath::Single(path) => std::slice::from_ref(path),
            AssetPath::Many(paths) => paths,
        }
    }
}

/// One `{ name, type, path }` entry of the asset manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub path: AssetPath,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, kind: AssetKind, path: AssetPath) -> Self {
        Self {
            name: name.into(),
            kind,
            path,
        }
    }

    /// Paths of this entry resolved against the asset root. Leading slashes
    /// are web-style absolute paths and are taken relative to the root.
    pub fn resolve(&self, root: &Path) -> Vec<PathBuf> {
        self.path
            .as_slice()
            .iter()
            .map(|p| root.join(p.trim_start_matches('/')))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest {
    entries: Vec<ManifestEntry>,
}

impl ResourceManifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parses a manifest, rejecting entries that share a name.
    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        let manifest: Self = serde_json::from_str(json)?;
        if let Some(name) = manifest.first_duplicate() {
            return Err(AssetError::DuplicateName(name.to_string()));
        }
        Ok(manifest)
    }

    pub fn from_path(path: &Path) -> Result<Self, AssetError> {
        let json = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Number of distinct names, i.e. how many items a full load yields.
    pub fn unique_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn first_duplicate(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[
        { "name": "environmentMap", "type": "cubeTexture",
          "path": ["/env/px.png", "/env/nx.png", "/env/py.png", "/env/ny.png", "/env/pz.png", "/env/nz.png"] },
        { "name": "chestGold", "type": "glbModel", "path": "/models/chest_gold.glb" },
        { "name": "floorColor", "type": "texture", "path": "/textures/floor.jpg" }
    ]"#;

    #[test]
    fn parses_web_manifest() {
        let manifest = ResourceManifest::from_json_str(MANIFEST).unwrap();
        assert_eq!(manifest.len(), 3);

        let env = &manifest.entries()[0];
        assert_eq!(env.kind, AssetKind::CubeTexture);
        assert_eq!(env.path.as_slice().len(), 6);

        let chest = &manifest.entries()[1];
        assert_eq!(chest.kind, AssetKind::GlbModel);
        assert_eq!(chest.path, AssetPath::Single("/models/chest_gold.glb".into()));
        assert!(manifest.contains("floorColor"));
    }

    #[test]
    fn resolves_paths_under_root() {
        let entry = ManifestEntry::new(
            "chest",
            AssetKind::GltfModel,
            AssetPath::Single("/models/chest.gltf".into()),
        );
        assert_eq!(
            entry.resolve(Path::new("assets")),
            vec![PathBuf::from("assets/models/chest.gltf")]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let json = r#"[
            {"name":"chest","type":"glbModel","path":"a.glb"},
            {"name":"chest","type":"glbModel","path":"b.glb"}
        ]"#;
        let err = ResourceManifest::from_json_str(json);
        assert!(matches!(err, Err(AssetError::DuplicateName(name)) if name == "chest"));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = ResourceManifest::from_json_str(r#"[{"name":"a","type":"video","path":"a.mp4"}]"#);
        assert!(matches!(err, Err(AssetError::Manifest(_))));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::gl::{GlApi, GlName};

/// Key identifying one asset packed into the atlas.
pub type AtlasEntryId = u64;

/// Placement of one asset inside the atlas texture, in texels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasEntry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub rotated: bool,
}

/// Immutable lookup table published by an initialized atlas.
///
/// Consumers hold it through an `Arc`; terminating the atlas drops the
/// atlas's own reference and deletes the texture, so anyone still holding an
/// old table must be rewired on the next context.
#[derive(Debug)]
pub struct AtlasTable {
    texture: GlName,
    width: u32,
    height: u32,
    entries: HashMap<AtlasEntryId, AtlasEntry>,
}

impl AtlasTable {
    pub fn texture(&self) -> GlName {
        self.texture
    }

    pub fn entry(&self, id: AtlasEntryId) -> Option<&AtlasEntry> {
        self.entries.get(&id)
    }

    /// Normalised `[u0, v0, u1, v1]` for `id`.
    pub fn uv_rect(&self, id: AtlasEntryId) -> Option<[f32; 4]> {
        let entry = self.entries.get(&id)?;
        let width = self.width.max(1) as f32;
        let height = self.height.max(1) as f32;
        Some([
            entry.x as f32 / width,
            entry.y as f32 / height,
            (entry.x + entry.width) as f32 / width,
            (entry.y + entry.height) as f32 / height,
        ])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared texture atlas owned by the coordinator.
#[derive(Debug, Default)]
pub struct AssetAtlas {
    table: Option<Arc<AtlasTable>>,
}

impl AssetAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the atlas texture and publishes the entry table.
    ///
    /// Returns `false` without touching the driver when already initialized.
    pub fn init(
        &mut self,
        gl: &dyn GlApi,
        width: u32,
        height: u32,
        entries: impl IntoIterator<Item = (AtlasEntryId, AtlasEntry)>,
    ) -> bool {
        if self.table.is_some() {
            return false;
        }
        let texture = gl.create_texture();
        let entries: HashMap<_, _> = entries.into_iter().collect();
        tracing::debug!(
            texture,
            width,
            height,
            entries = entries.len(),
            "asset atlas initialized"
        );
        self.table = Some(Arc::new(AtlasTable {
            texture,
            width,
            height,
            entries,
        }));
        true
    }

    /// Releases the atlas texture. Safe to call when never initialized.
    pub fn terminate(&mut self, gl: &dyn GlApi) {
        if let Some(table) = self.table.take() {
            gl.delete_texture(table.texture);
            tracing::debug!(texture = table.texture, "asset atlas terminated");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.table.is_some()
    }

    /// Shared view of the current table, if initialized.
    pub fn table(&self) -> Option<Arc<AtlasTable>> {
        self.table.clone()
    }

    pub fn entry(&self, id: AtlasEntryId) -> Option<AtlasEntry> {
        self.table.as_ref().and_then(|table| table.entry(id).copied())
    }
}

//! Resource cache collaborator.
//!
//! The coordinator owns one [`ResourceCache`] instead of reaching for a
//! process-wide singleton. It is created lazily on the first context because
//! building it already talks to the driver, and it survives context loss so
//! that `init`/`terminate` can run once per context.

use std::collections::HashMap;
use std::sync::Arc;

use crate::atlas::{AssetAtlas, AtlasEntry, AtlasEntryId, AtlasTable};
use crate::gl::{GlApi, GlName, TextureTarget};
use crate::types::RenderStateOptions;

/// What the coordinator needs from the resource cache.
pub trait ResourceCache {
    /// Builds the cache. Called once, with a current context.
    fn create(gl: &dyn GlApi, options: &RenderStateOptions) -> Self
    where
        Self: Sized;
    /// Prepares GPU-dependent resources for a freshly created context.
    fn init(&mut self, gl: &dyn GlApi);
    /// Releases GPU-dependent resources before the context goes away.
    fn terminate(&mut self, gl: &dyn GlApi);
    /// Points the texture cache at the atlas's current entry table.
    fn set_asset_atlas(&mut self, atlas: &AssetAtlas);
    fn debug_overdraw(&self) -> bool;
    fn current_program_mut(&mut self) -> &mut Option<Program>;
    fn texture_state_mut(&mut self) -> &mut TextureState;
}

/// A linked program and whether it is the one bound with `glUseProgram`.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    name: GlName,
    in_use: bool,
}

impl Program {
    pub fn new(name: GlName) -> Self {
        Self {
            name,
            in_use: false,
        }
    }

    pub fn name(&self) -> GlName {
        self.name
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    pub fn use_program(&mut self, gl: &dyn GlApi) {
        if !self.in_use {
            gl.use_program(self.name);
            self.in_use = true;
        }
    }

    /// Detaches the program from the pipeline.
    pub fn remove(&mut self, gl: &dyn GlApi) {
        gl.use_program(0);
        self.in_use = false;
    }
}

/// Active texture unit plus what is bound on each unit.
#[derive(Debug)]
pub struct TextureState {
    active_unit: Option<u32>,
    bound: Vec<Option<(TextureTarget, GlName)>>,
}

impl TextureState {
    pub fn new(units: usize) -> Self {
        Self {
            active_unit: Some(0),
            bound: vec![None; units.max(1)],
        }
    }

    pub fn units(&self) -> usize {
        self.bound.len()
    }

    /// Selects `unit`, skipping the call when it is already active.
    pub fn activate_texture(&mut self, gl: &dyn GlApi, unit: u32) {
        if self.active_unit != Some(unit) {
            gl.active_texture(unit);
            self.active_unit = Some(unit);
        }
    }

    /// Forgets which unit is active; the next activation always reaches GL.
    pub fn reset_active_texture(&mut self) {
        self.active_unit = None;
    }

    pub fn active_unit(&self) -> Option<u32> {
        self.active_unit
    }

    /// Binds `texture` on the active unit.
    ///
    /// With an unknown active unit the bind is issued but not cached.
    pub fn bind_texture(&mut self, gl: &dyn GlApi, target: TextureTarget, texture: GlName) {
        let slot = self
            .active_unit
            .and_then(|unit| self.bound.get_mut(unit as usize));
        match slot {
            Some(slot) if *slot == Some((target, texture)) => {}
            Some(slot) => {
                gl.bind_texture(target, texture);
                *slot = Some((target, texture));
            }
            None => gl.bind_texture(target, texture),
        }
    }

    /// Drops cache entries for a texture that is about to be deleted.
    ///
    /// GL unbinds deleted textures itself, so no call is issued.
    pub fn unbind_texture(&mut self, texture: GlName) {
        for slot in &mut self.bound {
            if matches!(slot, Some((_, bound)) if *bound == texture) {
                *slot = None;
            }
        }
    }

    /// Forgets every per-unit binding.
    pub fn reset_bound_textures(&mut self) {
        self.bound.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn bound_texture(&self, unit: u32) -> Option<GlName> {
        self.bound
            .get(unit as usize)
            .copied()
            .flatten()
            .map(|(_, name)| name)
    }
}

/// Where a texture lookup was satisfied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureLookup {
    Atlas { texture: GlName, entry: AtlasEntry },
    Texture(GlName),
}

/// Textures uploaded on demand, with atlas-backed assets short-circuited.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<AtlasEntryId, GlName>,
    atlas: Option<Arc<AtlasTable>>,
}

impl TextureCache {
    pub fn set_asset_atlas(&mut self, atlas: Option<Arc<AtlasTable>>) {
        self.atlas = atlas;
    }

    pub fn has_asset_atlas(&self) -> bool {
        self.atlas.is_some()
    }

    /// Resolves `asset`, preferring the atlas and otherwise allocating (and
    /// caching) a dedicated texture.
    pub fn get(&mut self, gl: &dyn GlApi, asset: AtlasEntryId) -> TextureLookup {
        if let Some(table) = &self.atlas {
            if let Some(entry) = table.entry(asset) {
                return TextureLookup::Atlas {
                    texture: table.texture(),
                    entry: *entry,
                };
            }
        }
        let texture = *self
            .textures
            .entry(asset)
            .or_insert_with(|| gl.create_texture());
        TextureLookup::Texture(texture)
    }

    /// Deletes every cached texture and returns the deleted names.
    pub fn clear(&mut self, gl: &dyn GlApi) -> Vec<GlName> {
        let names: Vec<GlName> = self.textures.drain().map(|(_, name)| name).collect();
        for name in &names {
            gl.delete_texture(*name);
        }
        names
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Default resource cache.
#[derive(Debug)]
pub struct Caches {
    pub texture_cache: TextureCache,
    texture_state: TextureState,
    current_program: Option<Program>,
    debug_overdraw: bool,
    initialized: bool,
}

impl Caches {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Resolves a texture through the cache and binds it on the active unit.
    pub fn bind_asset(&mut self, gl: &dyn GlApi, asset: AtlasEntryId) -> TextureLookup {
        let lookup = self.texture_cache.get(gl, asset);
        let name = match lookup {
            TextureLookup::Atlas { texture, .. } | TextureLookup::Texture(texture) => texture,
        };
        self.texture_state
            .bind_texture(gl, TextureTarget::Texture2d, name);
        lookup
    }
}

impl ResourceCache for Caches {
    fn create(_gl: &dyn GlApi, options: &RenderStateOptions) -> Self {
        tracing::debug!(
            debug_overdraw = options.debug_overdraw,
            texture_units = options.texture_units,
            "creating resource cache"
        );
        Self {
            texture_cache: TextureCache::default(),
            texture_state: TextureState::new(options.texture_units),
            current_program: None,
            debug_overdraw: options.debug_overdraw,
            initialized: false,
        }
    }

    fn init(&mut self, _gl: &dyn GlApi) {
        if self.initialized {
            return;
        }
        self.texture_state.reset_active_texture();
        self.texture_state.reset_bound_textures();
        self.initialized = true;
        tracing::debug!("resource cache initialized");
    }

    fn terminate(&mut self, gl: &dyn GlApi) {
        if !self.initialized {
            return;
        }
        for name in self.texture_cache.clear(gl) {
            self.texture_state.unbind_texture(name);
        }
        self.texture_cache.set_asset_atlas(None);
        self.current_program = None;
        self.initialized = false;
        tracing::debug!("resource cache terminated");
    }

    fn set_asset_atlas(&mut self, atlas: &AssetAtlas) {
        self.texture_cache.set_asset_atlas(atlas.table());
    }

    fn debug_overdraw(&self) -> bool {
        self.debug_overdraw
    }

    fn current_program_mut(&mut self) -> &mut Option<Program> {
        &mut self.current_program
    }

    fn texture_state_mut(&mut self) -> &mut TextureState {
        &mut self.texture_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingGl};

    fn caches(gl: &RecordingGl) -> Caches {
        let mut caches = Caches::create(gl, &RenderStateOptions::default());
        caches.init(gl);
        caches
    }

    #[test]
    fn reset_active_texture_forces_next_activation() {
        let gl = RecordingGl::new();
        let mut state = TextureState::new(4);
        state.activate_texture(&gl, 0);
        assert!(gl.is_empty());

        state.reset_active_texture();
        state.activate_texture(&gl, 0);
        assert_eq!(gl.calls(), vec![GlCall::ActiveTexture(0)]);
    }

    #[test]
    fn bound_textures_are_deduplicated_per_unit() {
        let gl = RecordingGl::new();
        let mut state = TextureState::new(2);
        state.bind_texture(&gl, TextureTarget::Texture2d, 5);
        state.bind_texture(&gl, TextureTarget::Texture2d, 5);
        state.activate_texture(&gl, 1);
        state.bind_texture(&gl, TextureTarget::Texture2d, 5);
        assert_eq!(gl.count(|call| matches!(call, GlCall::BindTexture(..))), 2);

        state.reset_bound_textures();
        assert_eq!(state.bound_texture(1), None);
        state.bind_texture(&gl, TextureTarget::Texture2d, 5);
        assert_eq!(gl.count(|call| matches!(call, GlCall::BindTexture(..))), 3);
    }

    #[test]
    fn unbind_forgets_external_binding() {
        let gl = RecordingGl::new();
        let mut state = TextureState::new(2);
        state.bind_texture(&gl, TextureTarget::External, 9);
        state.activate_texture(&gl, 1);
        state.bind_texture(&gl, TextureTarget::Texture2d, 4);

        state.unbind_texture(9);
        assert_eq!(state.bound_texture(0), None);
        assert_eq!(state.bound_texture(1), Some(4));

        state.activate_texture(&gl, 0);
        gl.take();
        state.bind_texture(&gl, TextureTarget::External, 9);
        assert_eq!(
            gl.calls(),
            vec![GlCall::BindTexture(TextureTarget::External, 9)]
        );
    }

    #[test]
    fn program_remove_detaches() {
        let gl = RecordingGl::new();
        let mut program = Program::new(12);
        program.use_program(&gl);
        assert!(program.is_in_use());
        program.remove(&gl);
        assert!(!program.is_in_use());
        assert_eq!(gl.calls(), vec![GlCall::UseProgram(12), GlCall::UseProgram(0)]);
    }

    #[test]
    fn atlas_assets_skip_texture_allocation() {
        let gl = RecordingGl::new();
        let mut atlas = AssetAtlas::new();
        let entry = AtlasEntry {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
            rotated: false,
        };
        atlas.init(&gl, 32, 32, [(1, entry)]);
        let mut caches = caches(&gl);
        caches.set_asset_atlas(&atlas);
        gl.take();

        assert!(matches!(
            caches.texture_cache.get(&gl, 1),
            TextureLookup::Atlas { .. }
        ));
        assert!(matches!(
            caches.texture_cache.get(&gl, 2),
            TextureLookup::Texture(_)
        ));
        assert_eq!(gl.count(|call| matches!(call, GlCall::CreateTexture(_))), 1);
    }

    #[test]
    fn terminate_deletes_textures_and_drops_atlas() {
        let gl = RecordingGl::new();
        let mut atlas = AssetAtlas::new();
        atlas.init(&gl, 16, 16, []);
        let mut caches = caches(&gl);
        caches.set_asset_atlas(&atlas);
        caches.bind_asset(&gl, 3);
        caches.bind_asset(&gl, 4);
        *caches.current_program_mut() = Some(Program::new(2));

        caches.terminate(&gl);
        assert!(!caches.is_initialized());
        assert!(caches.texture_cache.is_empty());
        assert!(!caches.texture_cache.has_asset_atlas());
        assert!(caches.current_program_mut().is_none());
        assert_eq!(gl.count(|call| matches!(call, GlCall::DeleteTexture(_))), 2);
    }
}

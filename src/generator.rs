//! The lightmap generator itself.
//!
//! Drives the whole pipeline: input validation, scene partitioning, face
//! packing, per-light shading, blur, bleed reduction and final baking.
//! Intermediate data is retained after a successful run so that the blur
//! radius and ambient color can be changed without re-shading the scene.

use crate::{
    bake::{bake, bake_texture, BakedScene, Texture},
    color::Color,
    error::LightmapGenerationError,
    input::{CastShadowObject, GetShadowObject, LightSource},
    light::Light,
    log::Log,
    page::{composite, pack_faces, LightmapPage},
    partition::{partition_scene, Partition},
    post::{blur_faces, reduce_bleeding},
    progress::{
        CancellationToken, ProgressCallback, ProgressIndicator, ProgressStage, StateCallback,
    },
    shade::{prepare_patches, shade_light_pass, snapshot_colors, ShadowWorld},
};
use bitflags::bitflags;

bitflags! {
    /// Generation option bits.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct GenerationFlags: u32 {
        /// Collapse all light colors to grayscale before accumulation.
        const NOCOLORS = 0b0001;
        /// Treat every shadow hit as opaque, skipping the per-hit opacity
        /// interpolation. Faster, less accurate.
        const NOTRANSPARENCY = 0b0010;
    }
}

/// Lightmap generation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct LightmapGenConfig {
    /// Floor color added to every baked texel.
    pub ambient_color: Color,
    /// Edge length of a lightmap page in texels.
    pub max_lightmap_size: usize,
    /// Texels per world unit, unless overridden per triangle.
    pub default_density: f32,
    /// Blur window reaches this many texels around each texel. Zero disables
    /// the blur stage.
    pub texel_blur_radius: usize,
    pub flags: GenerationFlags,
}

impl Default for LightmapGenConfig {
    fn default() -> Self {
        Self {
            ambient_color: Color::opaque(20, 20, 20),
            max_lightmap_size: 512,
            default_density: 10.0,
            texel_blur_radius: 2,
            flags: GenerationFlags::empty(),
        }
    }
}

/// See module docs.
pub struct LightmapGenerator<'a> {
    config: LightmapGenConfig,
    progress_indicator: ProgressIndicator,
    cancellation_token: CancellationToken,
    progress_callback: Option<ProgressCallback<'a>>,
    state_callback: Option<StateCallback<'a>>,
    partition: Option<Partition>,
    pages: Vec<LightmapPage>,
}

impl<'a> LightmapGenerator<'a> {
    pub fn new(config: LightmapGenConfig) -> Self {
        Self {
            config,
            progress_indicator: ProgressIndicator::default(),
            cancellation_token: CancellationToken::default(),
            progress_callback: None,
            state_callback: None,
            partition: None,
            pages: Vec::new(),
        }
    }

    pub fn config(&self) -> &LightmapGenConfig {
        &self.config
    }

    /// Progress counters, safe to poll from another thread.
    pub fn progress_indicator(&self) -> ProgressIndicator {
        self.progress_indicator.clone()
    }

    /// Token that cancels a running generation from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Sets a callback invoked with the overall progress fraction at every
    /// pipeline checkpoint. Returning `false` cancels generation.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback<'a>) {
        self.progress_callback = Some(callback);
    }

    /// Sets a callback invoked whenever the pipeline enters a new stage.
    pub fn set_state_callback(&mut self, callback: StateCallback<'a>) {
        self.state_callback = Some(callback);
    }

    /// Runs the full pipeline and returns the baked scene. Intermediate data
    /// is retained for [`Self::update_blur_radius`] and
    /// [`Self::update_ambient_color`]; call [`Self::clear`] to drop it.
    pub fn generate(
        &mut self,
        cast_shadow: &[CastShadowObject],
        get_shadow: &[GetShadowObject],
        lights: &[LightSource],
    ) -> Result<BakedScene, LightmapGenerationError> {
        self.partition = None;
        self.pages.clear();
        // The real bound is known only after packing; until then the
        // counters read as zero progress.
        self.progress_indicator.set_max_iterations(0);

        self.enter_stage(ProgressStage::Initializing, "validating input data");
        for object in cast_shadow.iter() {
            object.mesh.validate()?;
        }
        for object in get_shadow.iter() {
            object.mesh.validate()?;
        }
        let mut prepared_lights = Vec::new();
        for (index, light) in lights.iter().enumerate() {
            light.validate(index)?;
            if light.visible {
                prepared_lights.push(Light::new(
                    light,
                    self.config.flags.contains(GenerationFlags::NOCOLORS),
                ));
            }
        }
        self.checkpoint()?;

        self.enter_stage(ProgressStage::Partitioning, "partitioning and packing faces");
        let mut partition = partition_scene(
            get_shadow,
            self.config.default_density,
            self.config.max_lightmap_size,
        );
        let mut pages = pack_faces(&mut partition, self.config.max_lightmap_size)?;

        let total_triangles: u32 = partition
            .models
            .iter()
            .map(|model| model.triangles.len() as u32)
            .sum();
        let blur_units = if self.config.texel_blur_radius > 0 {
            partition.faces.len() as u32
        } else {
            0
        };
        let max_iterations = partition.models.len() as u32 * 8
            + total_triangles * (prepared_lights.len() as u32 + 1)
            + blur_units
            + partition.models.len() as u32;
        self.progress_indicator.set_max_iterations(max_iterations.max(1));
        self.progress_indicator
            .advance_progress(partition.models.len() as u32 * 8);
        self.checkpoint()?;

        self.enter_stage(ProgressStage::Shading, "shading texels");
        let shadow_world = ShadowWorld::new(cast_shadow);
        let respect_transparency = !self
            .config
            .flags
            .contains(GenerationFlags::NOTRANSPARENCY);

        prepare_patches(&mut partition, &self.progress_indicator);
        self.checkpoint()?;

        for light in prepared_lights.iter() {
            shade_light_pass(
                &mut partition,
                light,
                &shadow_world,
                respect_transparency,
                &self.progress_indicator,
            );
            // Cancellation is checked between light passes, never mid-pass.
            self.checkpoint()?;
        }
        snapshot_colors(&mut partition);

        if self.config.texel_blur_radius > 0 {
            self.enter_stage(ProgressStage::Blurring, "blurring lightmaps");
            blur_faces(
                &mut partition,
                self.config.texel_blur_radius,
                &self.progress_indicator,
            );
            self.checkpoint()?;
        }

        self.enter_stage(ProgressStage::Baking, "baking textures and meshes");
        composite(&partition, &mut pages);
        for page in pages.iter_mut() {
            reduce_bleeding(page);
        }
        let scene = bake(
            &mut partition,
            &pages,
            self.config.ambient_color,
            &self.progress_indicator,
        );
        self.checkpoint()?;

        self.enter_stage(ProgressStage::Completed, "done");
        Log::info(format!(
            "Lightmap generation finished: {} page(s), {} face(s), {} light(s).",
            scene.lightmaps.len(),
            partition.faces.len(),
            prepared_lights.len(),
        ));

        self.partition = Some(partition);
        self.pages = pages;

        Ok(scene)
    }

    /// Re-runs blur, bleed reduction and texture baking with a new radius,
    /// reusing the shading results of the last successful [`Self::generate`].
    /// Returns the rebuilt lightmap textures, or `None` when there is nothing
    /// to rebuild.
    pub fn update_blur_radius(&mut self, radius: usize) -> Option<Vec<Texture>> {
        self.config.texel_blur_radius = radius;
        let partition = self.partition.as_mut()?;

        self.progress_indicator.set_stage(ProgressStage::Blurring);
        self.progress_indicator
            .set_max_iterations((partition.faces.len() as u32).max(1));

        if radius == 0 {
            // Back to the raw shading results.
            for face in partition.faces.iter_mut() {
                for texel in face.texels.iter_mut() {
                    texel.color = texel.orig_color;
                }
                self.progress_indicator.advance_progress(1);
            }
        } else {
            blur_faces(partition, radius, &self.progress_indicator);
        }

        composite(partition, &mut self.pages);
        for page in self.pages.iter_mut() {
            reduce_bleeding(page);
        }
        let textures = self.rebuild_textures();
        self.progress_indicator.set_stage(ProgressStage::Completed);
        Some(textures)
    }

    /// Rebuilds the lightmap textures with a new ambient floor, reusing the
    /// shading results of the last successful [`Self::generate`].
    pub fn update_ambient_color(&mut self, ambient: Color) -> Option<Vec<Texture>> {
        self.config.ambient_color = ambient;
        self.partition.as_ref()?;
        Some(self.rebuild_textures())
    }

    /// Drops all retained intermediate data.
    pub fn clear(&mut self) {
        self.partition = None;
        self.pages.clear();
    }

    fn rebuild_textures(&self) -> Vec<Texture> {
        self.pages
            .iter()
            .map(|page| bake_texture(page, self.config.ambient_color))
            .collect()
    }

    fn enter_stage(&mut self, stage: ProgressStage, info: &str) {
        self.progress_indicator.set_stage(stage);
        if let Some(callback) = self.state_callback.as_mut() {
            callback(stage, info);
        }
    }

    fn checkpoint(&mut self) -> Result<(), LightmapGenerationError> {
        if self.cancellation_token.is_cancelled() {
            return Err(LightmapGenerationError::Cancelled);
        }
        if let Some(callback) = self.progress_callback.as_mut() {
            if !callback(self.progress_indicator.progress_fraction()) {
                return Err(LightmapGenerationError::Cancelled);
            }
        }
        Ok(())
    }
}

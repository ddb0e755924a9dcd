//! Offline lightmap generator.
//!
//! Computes per-texel static illumination for a scene of triangle meshes and
//! bakes it into packed lightmap textures applied to a rebuilt, render-ready
//! mesh. Geometry is partitioned into axis-aligned faces, faces are packed
//! into fixed-size lightmap pages, every texel is shaded with shadowed
//! diffuse lighting, and the result is blurred, bleed-reduced and baked.
//!
//! Limitations:
//!
//! - Both caster and receiver geometry must be completely static.
//! - Only diffuse lighting with hard shadow rays, no global illumination.
//!
//! # How to use
//!
//! ```no_run
//! # use lightbake::{
//! #     GetShadowObject, InputMesh, LightSource, LightmapGenConfig, LightmapGenerator,
//! # };
//! # use nalgebra::Matrix4;
//! # fn scene_data() -> (InputMesh, LightSource) { unimplemented!() }
//! let (mesh, light) = scene_data();
//! let mut generator = LightmapGenerator::new(LightmapGenConfig::default());
//! let scene = generator
//!     .generate(
//!         &[],
//!         &[GetShadowObject::new(mesh, Matrix4::identity())],
//!         &[light],
//!     )
//!     .unwrap();
//! for lightmap in scene.lightmaps.iter() {
//!     // Upload to the GPU, save to disk, ...
//! }
//! ```

#![forbid(unsafe_code)]

pub mod bake;
pub mod color;
pub mod error;
pub mod input;
pub mod log;
pub mod math;
pub mod progress;

mod generator;
mod light;
mod page;
mod partition;
mod post;
mod raster;
mod rectpack;
mod shade;

pub use bake::{BakedMesh, BakedScene, BakedSurface, BakedVertex, Texture};
pub use color::Color;
pub use error::LightmapGenerationError;
pub use generator::{GenerationFlags, LightmapGenConfig, LightmapGenerator};
pub use input::{
    CastShadowObject, GetShadowObject, InputMesh, InputVertex, LightKind, LightSource,
};
pub use math::TriangleDefinition;
pub use progress::{
    CancellationToken, ProgressCallback, ProgressIndicator, ProgressStage, StateCallback,
};

//! Frame composition for the colony viewer.
//!
//! Each tick turns an immutable `SimulationSnapshot` into a depth-ordered
//! list of draws, a parallel list of pointer hit regions and a cached
//! terrain raster. Two backends share one contract; see `backend`.

pub mod backend;
pub mod camera;
pub mod canvas;
pub mod clock;
pub mod compositor;
pub mod effects;
pub mod interaction;
pub mod metrics;
pub mod overlays;
pub mod pipeline;
pub mod raster;
pub mod registry;
pub mod scene;
pub mod sprites;
pub mod state;
pub mod surface;
pub mod terrain;

// Re-export commonly used types
pub use backend::{
    available_modes, create_renderer, BackendRequest, HostCapabilities, RenderBackend,
    RendererMode, RendererSession,
};
pub use camera::{CameraSnapshot, IsoCamera, OrbitCamera};
pub use clock::{FrameClock, FrameContext};
pub use compositor::{EntityCompositor, InteractiveEntity, RenderableItem};
pub use effects::{ChaChaSource, EffectsEngine, FifoPool, RandomSource, SequenceSource};
pub use interaction::{pick_best_hit, resolve_click_selection_outcome, InteractionRouter};
pub use metrics::{DebugStats, RenderMetrics};
pub use pipeline::{FramePipeline, FrameReport};
pub use state::{Color, Rect, Viewport};
pub use surface::{DisplayList, DrawCommand, DrawSurface};
pub use terrain::{build_terrain_signature, should_refresh_terrain_cache, TerrainCache};

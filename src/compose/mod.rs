//! Composite rendering and the filesystem-memoized composite cache.

mod cache;
mod lock;
mod renderer;

pub use cache::{CompositeCache, ResolveError};
pub use renderer::{RenderError, CANVAS_HEIGHT, CANVAS_WIDTH, PANEL_OFFSET};

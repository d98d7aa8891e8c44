//! Text rendering of a [`SourceTree`](crate::filesystem::SourceTree).

mod markers;
mod options;
mod renderer;

pub use markers::MarkerSet;
pub use options::{DisplayOrder, RenderOptions};
pub use renderer::{LineTone, RenderedLine, RenderedTree, render};

//! Calendar rendering: day-file text and the external PDF pipeline.

mod pcal;
mod renderer;

pub use pcal::{LOW_TIDE_THRESHOLD_M, artifact_filename, day_file, is_emphasized, sanitize_filename};
pub use renderer::{PcalConfig, PcalRenderer, RenderError, Renderer};

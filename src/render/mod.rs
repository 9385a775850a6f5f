pub mod target;
pub mod unit;

pub use target::{MemoryTarget, RenderTarget, TargetEvent, TextTarget};
pub use unit::{EntryView, Notice, RenderUnit, LINK_LABEL};

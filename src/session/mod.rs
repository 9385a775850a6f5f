pub mod controller;

pub use controller::{present_load_failure, RenderSession, RenderStart};

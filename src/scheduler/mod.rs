pub mod controller;
pub mod cycle;
pub mod idle;

pub use controller::{ChunkedScheduler, CycleHandle, CycleProgress, SharedTarget};
pub use cycle::{CyclePhase, RenderCycle, ResumeAt, StepOutcome};
pub use idle::{IdleHost, NeverIdle, Resume, SignalIdle, YieldNow};

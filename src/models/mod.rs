pub mod approach;
pub mod signal;

pub use approach::Approach;
pub use signal::{LightState, Phase, PhaseKind, SignalStatus};

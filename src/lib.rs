// League client automation: a paced control-API gateway plus ready-check and
// champion select helpers driven by the game flow phase.

pub mod automation;
pub mod config;
pub mod context;
pub mod error;
pub mod lcu;

pub use automation::{AutomationOrchestrator, AutomationStatus, GamePhase};
pub use config::{AutomationSettings, ClientSettings, Settings};
pub use context::LcuContext;
pub use error::LcuError;

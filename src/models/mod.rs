pub mod record;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod violation;

pub use record::{SessionHistory, SessionRecord};
pub use scoring::ScoringPolicy;
pub use session::{FocusSession, SessionState};
pub use timer::FocusTimer;
pub use violation::Violation;

pub mod matcher;
pub mod monitor;
pub mod observer;
pub mod sampler;
pub mod website;

pub use monitor::AppMonitor;
pub use observer::{ForegroundObserver, WebsiteObserver};
pub use sampler::{Channel, Reminder, TickSample, TrackerConfig, ViolationTracker};
pub use website::ChromeWebsiteMonitor;

pub mod handle;
mod session_loop;

pub use handle::{SessionHandle, SessionSnapshot};

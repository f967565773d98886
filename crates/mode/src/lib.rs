//! Parent/child mode for the Orbit Learn client
//!
//! The learning shell always starts in child mode. A parent moves to parent
//! mode by entering a 4-digit PIN that is stored locally per user. Five wrong
//! PINs lock the gate for fifteen minutes, and an idle parent session falls
//! back to child mode on its own.

mod clock;
mod error;
mod options;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ModeError;
pub use options::ModeOptions;
pub use session::{is_valid_pin, Mode, ModeEvent, ModeSession, ModeSnapshot, SwitchReason};

//! Session state, views and the controller that drives them.

pub mod actor;
pub mod controller;
pub mod registration;
pub mod sequence;
pub mod state;
pub mod view;

pub use actor::CloudHandle;
pub use controller::{Confirm, Controller, Decline, SearchOutcome, Snapshot};
pub use registration::{PendingRegistration, MIN_PASSWORD_LEN};
pub use sequence::{Lane, Sequencer, Ticket};
pub use state::{AuthState, Session};
pub use view::{Forms, NavChrome, Navigation, View, ViewController};

pub mod event;
pub mod interest;
pub mod payment;
pub mod rsvp;
pub mod user;

pub use event::{Event, EventSummary, NewEvent, SeedOutcome};
pub use interest::{Interest, InterestedUser};
pub use payment::{Payment, PaymentSession, PaymentStatus, PaymentUpsert};
pub use rsvp::{Rsvp, RsvpCancellation, RsvpInsert};
pub use user::{Role, User};

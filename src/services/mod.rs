pub mod events;
pub mod reservations;

pub use events::EventDirectory;
pub use reservations::ReservationManager;

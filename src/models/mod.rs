pub mod category;
pub mod event;
pub mod registration;
pub mod user;
pub mod venue;

pub use category::Category;
pub use event::{Event, EventStatus};
pub use registration::{EventRegistration, RegistrationStatus};
pub use user::{User, UserRole};
pub use venue::Venue;

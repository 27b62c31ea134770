pub mod email;
pub mod events;
pub mod google;
pub mod seed;
pub mod token;

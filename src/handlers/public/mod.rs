pub mod blogs;
pub mod directory;
pub mod events;
pub mod requests;

pub mod auth;
pub mod blogs;
pub mod directory;
pub mod requests;
pub mod users;

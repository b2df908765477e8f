pub mod blogs;
pub mod directory;
pub mod geocoding;
pub mod images;
pub mod moderation;
pub mod policy;
pub mod users;

pub mod blog;
pub mod profile;
pub mod rapper;
pub mod request;
pub mod user;

pub use blog::Blog;
pub use profile::{ProjectRef, Socials, TrackRef, YearsActive};
pub use rapper::Rapper;
pub use request::MusicianRequest;
pub use user::User;

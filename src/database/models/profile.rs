//! Optional structured sub-records shared between musician requests and
//! directory entries. Each has a defined empty form (`Default`) so the
//! copy-on-approve mapping stays total.

use serde::{Deserialize, Serialize};

/// Social profile links. Absent links are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Socials {
    pub instagram: String,
    pub twitter: String,
    pub youtube: String,
    pub soundcloud: String,
    pub spotify: String,
}

/// Active period; either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YearsActive {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

/// Reference to a single track (breakout track).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackRef {
    pub title: String,
    pub year: Option<i32>,
    pub url: String,
}

/// Reference to a defining project (album, mixtape, EP).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectRef {
    pub title: String,
    pub year: Option<i32>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_default() {
        let socials: Socials = serde_json::from_str("{}").unwrap();
        assert_eq!(socials, Socials::default());

        let track: TrackRef = serde_json::from_str("{}").unwrap();
        assert_eq!(track, TrackRef::default());
    }

    #[test]
    fn partial_socials_fill_remaining_fields() {
        let socials: Socials = serde_json::from_str(r#"{"instagram":"@mc"}"#).unwrap();
        assert_eq!(socials.instagram, "@mc");
        assert_eq!(socials.twitter, "");
    }
}

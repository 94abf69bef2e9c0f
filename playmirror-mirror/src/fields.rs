//! Field names and types of the mirror database.

use std::fmt;

pub const SONG: &str = "Song";
pub const ARTIST: &str = "Artist";
pub const ALBUM: &str = "Album";
pub const PLAYLIST: &str = "Playlist";
pub const PLAYLIST_ID: &str = "Playlist ID";
pub const TRACK_ID: &str = "Track ID";
pub const CREATOR: &str = "Creator";
pub const COVER: &str = "Cover";
pub const RELEASED: &str = "Released";
pub const LAST_SYNCED: &str = "Last Synced";
pub const LINK: &str = "Link";
pub const STATUS: &str = "Status";
pub const TRACK_COUNT: &str = "Track Count";

/// Property types the mirror relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    RichText,
    Files,
    Date,
    Url,
    Select,
    Number,
}

impl FieldKind {
    /// The store's type tag.
    pub fn tag(self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::RichText => "rich_text",
            FieldKind::Files => "files",
            FieldKind::Date => "date",
            FieldKind::Url => "url",
            FieldKind::Select => "select",
            FieldKind::Number => "number",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Every named field the writer fills, besides the title field.
pub const REQUIRED: &[(&str, FieldKind)] = &[
    (SONG, FieldKind::RichText),
    (ARTIST, FieldKind::RichText),
    (ALBUM, FieldKind::RichText),
    (PLAYLIST, FieldKind::RichText),
    (PLAYLIST_ID, FieldKind::RichText),
    (TRACK_ID, FieldKind::RichText),
    (CREATOR, FieldKind::RichText),
    (COVER, FieldKind::Files),
    (RELEASED, FieldKind::Date),
    (LAST_SYNCED, FieldKind::Date),
    (LINK, FieldKind::Url),
    (STATUS, FieldKind::Select),
    (TRACK_COUNT, FieldKind::Number),
];

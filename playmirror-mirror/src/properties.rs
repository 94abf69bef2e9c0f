//! Encoding rows into page properties and decoding pages back into records.
//!
//! Decoding never fails on a single field: a missing or oddly-typed property
//! takes the record default. Only the two identifying fields decide whether a
//! page is a track record, a playlist bucket, or skipped.

use chrono::{DateTime, FixedOffset};
use serde_json::{json, Map, Value};

use playmirror_core::{MirrorRecord, PlaylistId, RowId, Status, TrackId};

use crate::fields;
use crate::row::{BucketRow, TrackRow};

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn title(content: &str) -> Value {
    json!({ "title": [{ "text": { "content": content } }] })
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

fn files(url: &str) -> Value {
    if url.is_empty() {
        return json!({ "files": [] });
    }
    json!({ "files": [{ "name": "cover", "type": "external", "external": { "url": url } }] })
}

fn date(at: Option<DateTime<FixedOffset>>) -> Value {
    match at {
        Some(at) => json!({ "date": { "start": at.to_rfc3339() } }),
        None => json!({ "date": Value::Null }),
    }
}

fn url(link: &str) -> Value {
    if link.is_empty() {
        return json!({ "url": Value::Null });
    }
    json!({ "url": link })
}

fn select(status: Status) -> Value {
    json!({ "select": { "name": status.display_name(), "color": status.color() } })
}

/// Status and last-sync properties; the whole write of a retire.
pub fn status_properties(status: Status, synced_at: DateTime<FixedOffset>) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(fields::STATUS.into(), select(status));
    props.insert(fields::LAST_SYNCED.into(), date(Some(synced_at)));
    props
}

/// The full property set of a track row.
pub fn track_properties(title_field: &str, row: &TrackRow) -> Map<String, Value> {
    let mut props = status_properties(row.status, row.synced_at);
    props.insert(title_field.into(), title(&row.name));
    props.insert(fields::SONG.into(), rich_text(&row.name));
    props.insert(fields::ARTIST.into(), rich_text(&row.artist));
    props.insert(fields::ALBUM.into(), rich_text(&row.album));
    props.insert(fields::PLAYLIST.into(), rich_text(&row.playlist_name));
    props.insert(fields::PLAYLIST_ID.into(), rich_text(&row.playlist_id.0));
    props.insert(fields::TRACK_ID.into(), rich_text(&row.track_id.0));
    props.insert(fields::COVER.into(), files(&row.artwork_url));
    props.insert(fields::RELEASED.into(), date(row.published_at));
    props.insert(fields::LINK.into(), url(&row.link));
    props
}

/// Properties of a playlist bucket row. It carries no track id.
pub fn bucket_properties(title_field: &str, row: &BucketRow) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(title_field.into(), title(&row.name));
    props.insert(fields::PLAYLIST.into(), rich_text(&row.name));
    props.insert(fields::PLAYLIST_ID.into(), rich_text(&row.playlist_id.0));
    props.insert(fields::CREATOR.into(), rich_text(&row.creator));
    props.insert(fields::TRACK_COUNT.into(), json!({ "number": row.track_count }));
    props.insert(fields::COVER.into(), files(&row.cover_url));
    props.insert(fields::LAST_SYNCED.into(), date(Some(row.synced_at)));
    props
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// What a stored page turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRow {
    Record(MirrorRecord),
    Bucket(PlaylistId),
    Skipped(String),
}

/// Classify one page object as returned by the store.
pub fn decode_page(page: &Value) -> DecodedRow {
    let Some(row_id) = page.get("id").and_then(Value::as_str) else {
        return DecodedRow::Skipped("page without id".to_string());
    };
    let Some(props) = page.get("properties").and_then(Value::as_object) else {
        return DecodedRow::Skipped(format!("page {row_id} has no properties"));
    };

    let track_id = plain_text(props.get(fields::TRACK_ID));
    let playlist_id = plain_text(props.get(fields::PLAYLIST_ID));

    match (track_id, playlist_id) {
        (Some(track), Some(playlist)) => {
            let mut rec = MirrorRecord::with_defaults(
                RowId::from(row_id),
                TrackId(track),
                PlaylistId(playlist),
            );
            if let Some(name) =
                plain_text(props.get(fields::SONG)).or_else(|| title_text(props))
            {
                rec.name = name;
            }
            if let Some(artist) = plain_text(props.get(fields::ARTIST)) {
                rec.artist = artist;
            }
            if let Some(album) = plain_text(props.get(fields::ALBUM)) {
                rec.album = album;
            }
            rec.playlist_name = plain_text(props.get(fields::PLAYLIST)).unwrap_or_default();
            rec.artwork_url = file_url(props.get(fields::COVER)).unwrap_or_default();
            rec.status = select_name(props.get(fields::STATUS))
                .map(|n| Status::from_display_name(&n))
                .unwrap_or_default();
            rec.last_synced = date_start(props.get(fields::LAST_SYNCED));
            DecodedRow::Record(rec)
        }
        (None, Some(playlist)) => DecodedRow::Bucket(PlaylistId(playlist)),
        (Some(track), None) => {
            DecodedRow::Skipped(format!("page {row_id} has track {track} but no playlist"))
        }
        (None, None) => DecodedRow::Skipped(format!("page {row_id} has no identifiers")),
    }
}

/// Concatenated text of a title or rich-text property, `None` when blank.
fn plain_text(prop: Option<&Value>) -> Option<String> {
    let prop = prop?;
    let parts = prop
        .get("rich_text")
        .or_else(|| prop.get("title"))?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| {
            p.get("plain_text")
                .or_else(|| p.get("text").and_then(|t| t.get("content")))
                .and_then(Value::as_str)
        })
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Text of whichever property is title-typed.
fn title_text(props: &Map<String, Value>) -> Option<String> {
    props
        .values()
        .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
        .and_then(|p| plain_text(Some(p)))
}

fn select_name(prop: Option<&Value>) -> Option<String> {
    prop?
        .get("select")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn date_start(prop: Option<&Value>) -> Option<DateTime<FixedOffset>> {
    let start = prop?.get("date")?.get("start")?.as_str()?;
    DateTime::parse_from_rfc3339(start).ok()
}

fn file_url(prop: Option<&Value>) -> Option<String> {
    let first = prop?.get("files")?.as_array()?.first()?;
    first
        .get("external")
        .or_else(|| first.get("file"))?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 20, 0, 0)
            .unwrap()
    }

    fn sample_row() -> TrackRow {
        TrackRow {
            track_id: TrackId::from("42"),
            playlist_id: PlaylistId::from("7"),
            playlist_name: "Liked".into(),
            name: "Sunny Day".into(),
            artist: "Jay".into(),
            album: "Ye Hui Mei".into(),
            artwork_url: "https://img/1.jpg".into(),
            published_at: None,
            link: "https://music.163.com/#/song?id=42".into(),
            status: Status::VipRestricted,
            synced_at: at(),
        }
    }

    #[test]
    fn track_properties_carry_every_field() {
        let props = track_properties("Name", &sample_row());
        assert_eq!(props["Name"]["title"][0]["text"]["content"], "Sunny Day");
        assert_eq!(props[fields::TRACK_ID]["rich_text"][0]["text"]["content"], "42");
        assert_eq!(props[fields::STATUS]["select"]["name"], "VIP");
        assert_eq!(props[fields::STATUS]["select"]["color"], "purple");
        assert_eq!(props[fields::COVER]["files"][0]["external"]["url"], "https://img/1.jpg");
        assert!(props[fields::RELEASED]["date"].is_null());
        assert_eq!(
            props[fields::LAST_SYNCED]["date"]["start"],
            "2024-05-01T20:00:00+08:00"
        );
    }

    #[test]
    fn encoded_page_decodes_back() {
        let props = track_properties("Name", &sample_row());
        let page = json!({ "id": "row-1", "properties": props });
        match decode_page(&page) {
            DecodedRow::Record(rec) => {
                assert_eq!(rec.row_id, RowId::from("row-1"));
                assert_eq!(rec.key(), sample_row().key());
                assert_eq!(rec.name, "Sunny Day");
                assert_eq!(rec.playlist_name, "Liked");
                assert_eq!(rec.artwork_url, "https://img/1.jpg");
                assert_eq!(rec.status, Status::VipRestricted);
                assert_eq!(rec.last_synced, Some(at()));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn sparse_page_takes_defaults() {
        let page = json!({
            "id": "row-2",
            "properties": {
                "Track ID": { "type": "rich_text", "rich_text": [{ "plain_text": "9" }] },
                "Playlist ID": { "type": "rich_text", "rich_text": [{ "plain_text": "7" }] },
                "Status": { "type": "select", "select": { "name": "Mystery" } },
                "Last Synced": { "type": "date", "date": { "start": "not a date" } }
            }
        });
        let DecodedRow::Record(rec) = decode_page(&page) else {
            panic!("expected record");
        };
        assert_eq!(rec.name, MirrorRecord::UNKNOWN_NAME);
        assert_eq!(rec.artist, MirrorRecord::UNKNOWN_ARTIST);
        assert_eq!(rec.album, MirrorRecord::UNKNOWN_ALBUM);
        assert_eq!(rec.playlist_name, "");
        assert_eq!(rec.status, Status::Unknown);
        assert!(rec.last_synced.is_none());
    }

    #[test]
    fn name_falls_back_to_title_property() {
        let page = json!({
            "id": "row-3",
            "properties": {
                "Title": { "type": "title", "title": [{ "plain_text": "From title" }] },
                "Track ID": { "rich_text": [{ "plain_text": "1" }] },
                "Playlist ID": { "rich_text": [{ "plain_text": "2" }] }
            }
        });
        let DecodedRow::Record(rec) = decode_page(&page) else {
            panic!("expected record");
        };
        assert_eq!(rec.name, "From title");
    }

    #[test]
    fn bucket_and_skipped_rows() {
        let bucket = BucketRow {
            playlist_id: PlaylistId::from("7"),
            name: "Liked".into(),
            creator: "me".into(),
            track_count: 3,
            cover_url: String::new(),
            synced_at: at(),
        };
        let page = json!({ "id": "b", "properties": bucket_properties("Name", &bucket) });
        assert_eq!(decode_page(&page), DecodedRow::Bucket(PlaylistId::from("7")));

        let orphan = json!({
            "id": "o",
            "properties": { "Track ID": { "rich_text": [{ "plain_text": "1" }] } }
        });
        assert!(matches!(decode_page(&orphan), DecodedRow::Skipped(_)));
        assert!(matches!(decode_page(&json!({ "properties": {} })), DecodedRow::Skipped(_)));
        assert!(matches!(decode_page(&json!({ "id": "e", "properties": {} })), DecodedRow::Skipped(_)));
    }
}

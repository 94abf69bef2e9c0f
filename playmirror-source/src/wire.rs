//! Response payloads of the music listing API and their conversion into
//! domain types.
//!
//! Every field the API may omit or null out is optional here; defaults are
//! applied during conversion so one sparse track never fails a page.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Deserialize;
use serde_json::Value;

use playmirror_core::{MirrorRecord, PlaylistId, PlaylistInfo, RemoteError, RemoteTrack, TrackId};

/// Public page of a track, used as the mirror's canonical link.
pub const TRACK_LINK_BASE: &str = "https://music.163.com/#/song?id=";

#[derive(Debug, Deserialize)]
pub(crate) struct WireArtist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAlbum {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "picUrl")]
    pub pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSong {
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ar: Vec<WireArtist>,
    #[serde(default)]
    pub al: Option<WireAlbum>,
    #[serde(default, rename = "publishTime")]
    pub publish_time: Option<i64>,
    #[serde(default)]
    pub fee: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCreator {
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePlaylist {
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "trackCount")]
    pub track_count: Option<u64>,
    #[serde(default)]
    pub creator: Option<WireCreator>,
    #[serde(default, rename = "coverImgUrl")]
    pub cover_img_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserPlaylistsResponse {
    pub playlist: Vec<WirePlaylist>,
    #[serde(default)]
    pub more: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistDetailResponse {
    pub playlist: WirePlaylist,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SongsResponse {
    pub songs: Vec<WireSong>,
}

/// Render a JSON id (number or string) as a string.
pub(crate) fn id_string(endpoint: &str, id: &Value) -> Result<String, RemoteError> {
    match id {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        other => Err(RemoteError::malformed(
            endpoint,
            format!("unexpected id value: {other}"),
        )),
    }
}

/// Reject payloads whose API-level `code` is not 200.
pub(crate) fn check_code(endpoint: &str, body: &Value) -> Result<(), RemoteError> {
    match body.get("code").and_then(Value::as_i64) {
        Some(200) | None => Ok(()),
        Some(code) => Err(RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: code,
            message: body
                .get("message")
                .or_else(|| body.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("api error")
                .to_string(),
        }),
    }
}

/// Decode a response body once its code has been checked.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    body: Value,
) -> Result<T, RemoteError> {
    check_code(endpoint, &body)?;
    serde_json::from_value(body).map_err(|e| RemoteError::malformed(endpoint, e.to_string()))
}

impl WireSong {
    pub(crate) fn into_track(
        self,
        endpoint: &str,
        offset: FixedOffset,
    ) -> Result<RemoteTrack, RemoteError> {
        let id = id_string(endpoint, &self.id)?;
        let artist = self
            .ar
            .into_iter()
            .find_map(|a| a.name.filter(|n| !n.is_empty()))
            .unwrap_or_else(|| MirrorRecord::UNKNOWN_ARTIST.to_string());
        let (album, artwork_url) = match self.al {
            Some(al) => (al.name, al.pic_url),
            None => (None, None),
        };
        Ok(RemoteTrack {
            link: format!("{TRACK_LINK_BASE}{id}"),
            id: TrackId(id),
            name: non_empty_or(self.name, MirrorRecord::UNKNOWN_NAME),
            artist,
            album: non_empty_or(album, MirrorRecord::UNKNOWN_ALBUM),
            artwork_url: artwork_url.unwrap_or_default(),
            published_at: self.publish_time.and_then(|ms| publish_date(ms, offset)),
            // A missing fee code derives `Unknown`.
            fee: self.fee.unwrap_or(-1),
        })
    }
}

impl WirePlaylist {
    pub(crate) fn into_info(self, endpoint: &str) -> Result<PlaylistInfo, RemoteError> {
        Ok(PlaylistInfo {
            id: PlaylistId(id_string(endpoint, &self.id)?),
            name: self.name.unwrap_or_default(),
            track_count: self.track_count.unwrap_or(0),
            creator: self.creator.and_then(|c| c.nickname).unwrap_or_default(),
            cover_url: self.cover_img_url.unwrap_or_default(),
        })
    }
}

/// Millisecond epoch timestamps; zero or negative means "unknown".
fn publish_date(ms: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if ms <= 0 {
        return None;
    }
    offset.timestamp_millis_opt(ms).single()
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

//! Blocking HTTP client for the music listing API.

use chrono::FixedOffset;
use serde_json::Value;

use playmirror_core::{
    config::SourceSettings, PlaylistId, PlaylistInfo, RemoteError, RemoteTrack, TrackId,
};

use crate::paging::collect_pages;
use crate::wire::{decode, PlaylistDetailResponse, SongsResponse, UserPlaylistsResponse};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REFERER: &str = "https://music.163.com/";

/// Playlists requested per page of a user listing.
const USER_PLAYLIST_PAGE: u32 = 30;

const USER_PLAYLISTS: &str = "/api/user/playlist";
const PLAYLIST_DETAIL: &str = "/api/v6/playlist/detail";
const PLAYLIST_TRACKS: &str = "/api/v3/playlist/track/all";
const SONG_DETAIL: &str = "/api/song/detail";

/// Read access to the remote playlists.
///
/// Implementations surface failures as [`RemoteError`] and never retry;
/// callers wrap calls in a retry policy.
pub trait SourceClient {
    /// Every playlist owned or followed by `user_id`, in listing order.
    fn user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistInfo>, RemoteError>;

    fn playlist_info(&self, id: &PlaylistId) -> Result<PlaylistInfo, RemoteError>;

    /// The full ordered track list of a playlist.
    fn playlist_tracks(&self, id: &PlaylistId) -> Result<Vec<RemoteTrack>, RemoteError>;

    /// Whether the track still exists in the wider catalog.
    fn track_available(&self, id: &TrackId) -> Result<bool, RemoteError>;
}

/// Connection parameters for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Session cookie, passed through verbatim.
    pub cookie: String,
    pub settings: SourceSettings,
    /// Offset used for publish dates.
    pub offset: FixedOffset,
}

/// [`SourceClient`] over the public web API.
pub struct HttpSource {
    agent: ureq::Agent,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.settings.timeout())
            .user_agent(USER_AGENT)
            .build();
        Self { agent, config }
    }

    fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, RemoteError> {
        let url = format!(
            "{}{}",
            self.config.settings.base_url.trim_end_matches('/'),
            endpoint
        );
        let mut request = self
            .agent
            .get(&url)
            .set("Referer", REFERER)
            .set("Cookie", &self.config.cookie);
        for (key, value) in query {
            request = request.query(key, value);
        }
        tracing::debug!("GET {endpoint} {query:?}");
        let response = request
            .call()
            .map_err(|e| RemoteError::from_http(endpoint, e))?;
        response
            .into_json::<Value>()
            .map_err(|e| RemoteError::malformed(endpoint, e.to_string()))
    }
}

impl SourceClient for HttpSource {
    fn user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistInfo>, RemoteError> {
        let mut more = true;
        let playlists = collect_pages(
            USER_PLAYLIST_PAGE,
            self.config.settings.page_delay(),
            |offset, limit| {
                if !more {
                    return Ok(Vec::new());
                }
                let body = self.get(
                    USER_PLAYLISTS,
                    &[
                        ("uid", user_id.to_string()),
                        ("limit", limit.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )?;
                let page: UserPlaylistsResponse = decode(USER_PLAYLISTS, body)?;
                more = page.more;
                page.playlist
                    .into_iter()
                    .map(|p| p.into_info(USER_PLAYLISTS))
                    .collect()
            },
        )?;
        tracing::info!("listed {} playlists for user {user_id}", playlists.len());
        Ok(playlists)
    }

    fn playlist_info(&self, id: &PlaylistId) -> Result<PlaylistInfo, RemoteError> {
        let body = self.get(PLAYLIST_DETAIL, &[("id", id.0.clone())])?;
        let detail: PlaylistDetailResponse = decode(PLAYLIST_DETAIL, body)?;
        detail.playlist.into_info(PLAYLIST_DETAIL)
    }

    fn playlist_tracks(&self, id: &PlaylistId) -> Result<Vec<RemoteTrack>, RemoteError> {
        let offset_tz = self.config.offset;
        let tracks = collect_pages(
            self.config.settings.page_size,
            self.config.settings.page_delay(),
            |offset, limit| {
                let body = self.get(
                    PLAYLIST_TRACKS,
                    &[
                        ("id", id.0.clone()),
                        ("limit", limit.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )?;
                let page: SongsResponse = decode(PLAYLIST_TRACKS, body)?;
                page.songs
                    .into_iter()
                    .map(|s| s.into_track(PLAYLIST_TRACKS, offset_tz))
                    .collect()
            },
        )?;
        tracing::info!("fetched {} tracks for playlist {id}", tracks.len());
        Ok(tracks)
    }

    fn track_available(&self, id: &TrackId) -> Result<bool, RemoteError> {
        let body = self.get(
            SONG_DETAIL,
            &[("id", id.0.clone()), ("ids", format!("[{}]", id.0))],
        )?;
        let detail: SongsResponse = decode(SONG_DETAIL, body)?;
        Ok(!detail.songs.is_empty())
    }
}

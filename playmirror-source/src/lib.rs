//! # playmirror-source
//!
//! Source Reader: lists remote playlists and their tracks.
//!
//! [`SourceClient`] is the seam the sync pipeline depends on; [`HttpSource`]
//! implements it over the streaming service's web API.

mod client;
mod paging;
mod wire;

pub use client::{HttpSource, SourceClient, SourceConfig};
pub use wire::TRACK_LINK_BASE;

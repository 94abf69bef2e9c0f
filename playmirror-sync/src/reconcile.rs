//! Three-way diff between a playlist's remote tracks and its mirror records.

use std::collections::{HashMap, HashSet};

use playmirror_core::{MirrorRecord, PlaylistId, RemoteTrack, TrackId, UpdatePredicate};

/// Outcome of comparing one playlist. Every track id on either side lands in
/// exactly one of the four sets.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation<'a> {
    /// Remote tracks with no record; remote order.
    pub to_add: Vec<&'a RemoteTrack>,
    /// Remote tracks whose record is stale; remote order.
    pub to_update: Vec<(&'a RemoteTrack, &'a MirrorRecord)>,
    /// Remote tracks whose record is current; remote order.
    pub unchanged: Vec<(&'a RemoteTrack, &'a MirrorRecord)>,
    /// Records whose track left the playlist; mirror order.
    pub to_retire: Vec<&'a MirrorRecord>,
}

impl Reconciliation<'_> {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_retire.is_empty()
    }
}

/// Whether `record` must be rewritten to match `track`.
pub fn needs_update(track: &RemoteTrack, record: &MirrorRecord, predicate: UpdatePredicate) -> bool {
    if track.status() != record.status {
        return true;
    }
    match predicate {
        UpdatePredicate::StatusOnly => false,
        UpdatePredicate::StatusAndMetadata => {
            track.name != record.name || track.artist != record.artist || track.album != record.album
        }
    }
}

/// Compare `remote` with the records of `mirror` linked to `playlist_id`.
///
/// Duplicate track ids on either side are matched on their first
/// occurrence; later duplicates are ignored.
pub fn reconcile<'a>(
    remote: &'a [RemoteTrack],
    mirror: &'a [MirrorRecord],
    playlist_id: &PlaylistId,
    predicate: UpdatePredicate,
) -> Reconciliation<'a> {
    let mut by_track: HashMap<&TrackId, &MirrorRecord> = HashMap::new();
    let mut mirror_order: Vec<&MirrorRecord> = Vec::new();
    for record in mirror.iter().filter(|r| &r.playlist_id == playlist_id) {
        if !by_track.contains_key(&record.track_id) {
            by_track.insert(&record.track_id, record);
            mirror_order.push(record);
        }
    }

    let mut result = Reconciliation::default();
    let mut seen: HashSet<&TrackId> = HashSet::new();
    for track in remote {
        if !seen.insert(&track.id) {
            tracing::debug!("duplicate remote track {} in playlist {playlist_id}", track.id);
            continue;
        }
        match by_track.get(&track.id).copied() {
            None => result.to_add.push(track),
            Some(record) if needs_update(track, record, predicate) => {
                result.to_update.push((track, record))
            }
            Some(record) => result.unchanged.push((track, record)),
        }
    }

    result.to_retire = mirror_order
        .into_iter()
        .filter(|r| !seen.contains(&r.track_id))
        .collect();

    tracing::debug!(
        "playlist {playlist_id}: {} to add, {} to update, {} unchanged, {} to retire",
        result.to_add.len(),
        result.to_update.len(),
        result.unchanged.len(),
        result.to_retire.len()
    );
    result
}

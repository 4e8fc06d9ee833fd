use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::types::{CumulativePlaylist, CumulativeTrack, PlaylistId, PlaylistSnapshot, Track};

pub struct CumulativeManager;

impl CumulativeManager {
    /// Folds the latest snapshot into the cumulative ledger of every track
    /// that has ever appeared in the playlist.
    ///
    /// Tracks that vanished get `date_removed` set (kept if already set);
    /// tracks that reappear have it cleared. `date_added` only ever moves to
    /// an earlier date.
    pub fn update(
        previous: Option<CumulativePlaylist>,
        id: &PlaylistId,
        snapshot: &PlaylistSnapshot,
        today: NaiveDate,
    ) -> CumulativePlaylist {
        let first_scrape = previous.is_none();
        let (date_first_scraped, previous_tracks) = match previous {
            Some(p) => (p.date_first_scraped, p.tracks),
            None => (today, Vec::new()),
        };

        let old: BTreeMap<String, CumulativeTrack> = previous_tracks
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        let current: BTreeMap<&str, &Track> =
            snapshot.tracks.iter().map(|t| (t.id.as_str(), t)).collect();

        let ids: BTreeSet<&str> = old
            .keys()
            .map(String::as_str)
            .chain(current.keys().copied())
            .collect();

        let mut tracks: Vec<CumulativeTrack> = ids
            .into_iter()
            .filter_map(|track_id| {
                let old_data = old.get(track_id);
                match (old_data, current.get(track_id)) {
                    (Some(o), None) => Some(CumulativeTrack {
                        date_removed: o.date_removed.or(Some(today)),
                        ..o.clone()
                    }),
                    (o, Some(n)) => Some(Self::present(o, n, today, first_scrape)),
                    (None, None) => None,
                }
            })
            .collect();

        tracks.sort_by_cached_key(|t| {
            (
                t.name.to_lowercase(),
                t.artists.iter().map(|a| a.to_lowercase()).collect::<Vec<_>>(),
                t.duration_ms,
                t.id.clone(),
            )
        });

        CumulativePlaylist {
            id: id.clone(),
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            tracks,
            date_first_scraped,
        }
    }

    fn present(
        old: Option<&CumulativeTrack>,
        new: &Track,
        today: NaiveDate,
        first_scrape: bool,
    ) -> CumulativeTrack {
        let reported = new.added_at.map(|dt| dt.date_naive());
        let mut date_added = reported.unwrap_or(today);
        let mut asterisk = first_scrape && reported.is_none();

        if let Some(o) = old {
            if o.date_added <= date_added {
                date_added = o.date_added;
                asterisk = o.date_added_asterisk;
            }
        }

        CumulativeTrack {
            id: new.id.clone(),
            name: new.name.clone(),
            artists: new.artists.clone(),
            album: new.album.clone(),
            duration_ms: new.duration_ms,
            date_added,
            date_added_asterisk: asterisk,
            date_removed: None,
        }
    }
}

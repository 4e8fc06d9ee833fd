//! Human-readable renderings of a playlist snapshot.
//!
//! The plain format is meant for line-based diffs in the repository history:
//! one track per line, nothing else. The Markdown format is what people read
//! when browsing the archive.

use tabled::{Table, settings::Style};

use crate::{
    types::{PlaylistId, PlaylistSnapshot, Track, TrackTableRow},
    utils,
};

/// One line per track: `name -- artist, artist -- album`.
pub fn plain(snapshot: &PlaylistSnapshot) -> String {
    let mut out = String::new();
    for track in &snapshot.tracks {
        out.push_str(&plain_line(track));
        out.push('\n');
    }
    out
}

fn plain_line(track: &Track) -> String {
    format!(
        "{} -- {} -- {}",
        track.name,
        track.artists.join(", "),
        track.album
    )
}

/// Markdown page with the playlist header and a track table.
pub fn markdown(id: &PlaylistId, snapshot: &PlaylistSnapshot) -> String {
    let total_ms: u64 = snapshot.tracks.iter().map(|t| t.duration_ms).sum();

    let mut out = format!("# {}\n\n", escape(&snapshot.name));
    if !snapshot.description.is_empty() {
        out.push_str(&format!("> {}\n\n", escape(&snapshot.description)));
    }
    out.push_str(&format!(
        "[Spotify](https://open.spotify.com/playlist/{id}) | {count} tracks | {length}\n\n",
        id = id,
        count = snapshot.tracks.len(),
        length = utils::format_duration(total_ms),
    ));

    if snapshot.tracks.is_empty() {
        out.push_str("_This playlist is empty._\n");
        return out;
    }

    let rows: Vec<TrackTableRow> = snapshot
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| TrackTableRow {
            position: i + 1,
            title: escape(&t.name),
            artists: escape(&t.artists.join(", ")),
            album: escape(&t.album),
            length: utils::format_duration(t.duration_ms),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::markdown());
    out.push_str(&table.to_string());
    out.push('\n');
    out
}

// Pipes would break the table, newlines would break the layout.
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

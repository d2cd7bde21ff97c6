use std::fs;
use std::path::Path;

use kbm_sheet::{LaneGroup, Note};
use kbm_transport::seconds_per_row;
use rayon::iter::Either;
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::{Meta, Project, ProjectError};

pub const IN_PLAYING_FILE: &str = "inPlaying.json";
pub const META_FILE: &str = "meta.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportedNoteType {
    Hit,
    Hold,
}

// the game reads the note type as its enum ordinal
impl Serialize for ExportedNoteType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            ExportedNoteType::Hit => 0,
            ExportedNoteType::Hold => 1,
        })
    }
}

/// A note in game time, with its lane counted inside its hand's group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedNote {
    #[serde(rename = "type")]
    pub kind: ExportedNoteType,
    pub strike_time: f32,
    pub track_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InPlaying {
    pub left_notes: Vec<ExportedNote>,
    pub right_notes: Vec<ExportedNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub meta: Meta,
    pub in_playing: InPlaying,
}

fn export_note(note: &Note, time_per_row: f64) -> ExportedNote {
    let strike_time = note.start_row() as f64 * time_per_row;
    match note {
        Note::Hit { position } => ExportedNote {
            kind: ExportedNoteType::Hit,
            strike_time: strike_time as f32,
            track_index: position.lane,
            length: None,
        },
        Note::Hold(hold) => ExportedNote {
            kind: ExportedNoteType::Hold,
            strike_time: strike_time as f32,
            track_index: hold.lane(),
            length: Some((hold.end().row as f64 * time_per_row - strike_time) as f32),
        },
    }
}

fn sort_by_strike_time(notes: &mut [ExportedNote]) {
    notes.sort_by(|a, b| {
        a.strike_time
            .total_cmp(&b.strike_time)
            .then(a.track_index.cmp(&b.track_index))
    });
}

/// Convert the project's sheet into per-hand note lists in seconds.
pub fn export_level(project: &Project) -> Level {
    let sheet = project.sheet();
    let time_per_row = seconds_per_row(project.bpm());

    let (mut left_notes, mut right_notes): (Vec<_>, Vec<_>) = sheet
        .values()
        .into_par_iter()
        .map(|note| {
            let mut exported = export_note(&note, time_per_row);
            match sheet.lane_group(note.lane()) {
                LaneGroup::Left(index) => {
                    exported.track_index = index;
                    Either::Left(exported)
                }
                LaneGroup::Right(index) => {
                    exported.track_index = index;
                    Either::Right(exported)
                }
            }
        })
        .partition_map(|side| side);

    sort_by_strike_time(&mut left_notes);
    sort_by_strike_time(&mut right_notes);

    Level {
        meta: project.meta().clone(),
        in_playing: InPlaying {
            left_notes,
            right_notes,
        },
    }
}

/// Write a playable level folder: `inPlaying.json`, `meta.json` and the music
/// as `mus<ext>`. The JSON documents and the music are written concurrently.
pub fn save_package(project: &Project, dir: &Path) -> Result<(), ProjectError> {
    fs::create_dir_all(dir)?;
    let level = export_level(project);

    let (text, audio) = rayon::join(
        || -> Result<(), ProjectError> {
            let in_playing = serde_json::to_vec(&level.in_playing)?;
            let meta = serde_json::to_vec(&level.meta)?;
            fs::write(dir.join(IN_PLAYING_FILE), in_playing)?;
            fs::write(dir.join(META_FILE), meta)?;
            Ok(())
        },
        || fs::write(dir.join(format!("mus{}", project.meta().ext)), project.meta().music()),
    );
    text?;
    audio?;

    log::info!(
        "exported '{}' to {} ({} left, {} right notes)",
        project.meta().name,
        dir.display(),
        level.in_playing.left_notes.len(),
        level.in_playing.right_notes.len()
    );
    Ok(())
}

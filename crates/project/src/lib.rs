mod export;
mod load;
mod meta;
mod save;
mod serde_helpers;
mod sheet_json;

use std::path::PathBuf;
use std::sync::Arc;

use kbm_decode::{AudioFormat, DecodeError};
use kbm_sheet::{Sheet, SheetError};
use kbm_transport::AudioArc;

pub use export::{ExportedNote, ExportedNoteType, InPlaying, Level, export_level, save_package};
pub use load::{load_project, load_project_meta};
pub use meta::{Meta, MetaBuilder, MetaError, Vector3};
pub use save::save_project;
pub use sheet_json::{SHEET_TYPE, sheet_from_json, sheet_to_json};

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("project file is incomplete, missing '{0}' entry")]
    MissingBlob(&'static str),

    #[error("invalid sheet: {0}")]
    InvalidSheet(String),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error("failed to read music: {0}")]
    Decode(#[from] DecodeError),

    #[error(
        "meta declares {meta_left}+{meta_right} lanes but the sheet has {sheet_left}+{sheet_right}"
    )]
    LaneMismatch {
        meta_left: i32,
        meta_right: i32,
        sheet_left: i32,
        sheet_right: i32,
    },

    #[error("project has no save path")]
    NoSavePath,
}

/// A chart being edited: its metadata, embedded music and note sheet.
#[derive(Debug, Clone)]
pub struct Project {
    meta: Meta,
    sheet: Arc<Sheet>,
    saving_path: Option<PathBuf>,
}

impl Project {
    pub fn new(meta: Meta, sheet: Sheet) -> Result<Self, ProjectError> {
        if meta.left_track_size != sheet.left_size() || meta.right_track_size != sheet.right_size()
        {
            return Err(ProjectError::LaneMismatch {
                meta_left: meta.left_track_size,
                meta_right: meta.right_track_size,
                sheet_left: sheet.left_size(),
                sheet_right: sheet.right_size(),
            });
        }
        Ok(Self {
            meta,
            sheet: Arc::new(sheet),
            saving_path: None,
        })
    }

    /// A project with an empty sheet sized from the meta's lane groups.
    pub fn with_empty_sheet(meta: Meta) -> Result<Self, ProjectError> {
        let sheet = Sheet::new(
            meta.left_track_size + meta.right_track_size,
            meta.left_track_size,
            meta.right_track_size,
        )?;
        Self::new(meta, sheet)
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn sheet(&self) -> &Arc<Sheet> {
        &self.sheet
    }

    pub fn bpm(&self) -> f64 {
        self.meta.bpm
    }

    pub fn length_seconds(&self) -> f64 {
        self.meta.length_seconds
    }

    pub fn saving_path(&self) -> Option<&PathBuf> {
        self.saving_path.as_ref()
    }

    pub fn set_saving_path(&mut self, path: impl Into<PathBuf>) {
        self.saving_path = Some(path.into());
    }

    pub fn audio_format(&self) -> Result<AudioFormat, DecodeError> {
        AudioFormat::from_extension(&self.meta.ext)
    }

    /// Decode the embedded music into samples for playback.
    pub fn decode_music(&self) -> Result<AudioArc, DecodeError> {
        kbm_decode::decode_bytes(self.meta.music(), self.audio_format()?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::meta;
    use kbm_sheet::Note;

    #[test]
    fn test_empty_sheet_follows_meta() {
        let project = Project::with_empty_sheet(meta(2, 3)).expect("project");
        assert_eq!(project.sheet().column(), 5);
        assert_eq!(project.sheet().left_size(), 2);
        assert!(project.sheet().is_empty());
    }

    #[test]
    fn test_lane_mismatch_is_rejected() {
        let sheet = Sheet::new(4, 1, 3).expect("sheet");
        let result = Project::new(meta(2, 2), sheet);
        assert!(matches!(result, Err(ProjectError::LaneMismatch { .. })));
    }

    #[test]
    fn test_clone_shares_sheet() {
        let project = Project::with_empty_sheet(meta(2, 2)).expect("project");
        let clone = project.clone();
        project.sheet().insert(Note::hit(0, 0));
        assert_eq!(clone.sheet().len(), 1);
    }

    #[test]
    fn test_decode_music() {
        let project = Project::with_empty_sheet(meta(2, 2)).expect("project");
        let audio = project.decode_music().expect("decode");
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.frames(), 8000);
    }
}

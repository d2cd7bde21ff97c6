use std::sync::Arc;

use kbm_decode::{AudioFormat, AudioInfo, DecodeError};
use serde::{Deserialize, Serialize};

/// Largest lane group a level may declare.
pub const MAX_TRACK_SIZE: i32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("bpm must be positive, got {0}")]
    InvalidBpm(f64),

    #[error("difficulty must be positive, got {0}")]
    InvalidDifficulty(i32),

    #[error("{group} track size must be between 1 and {MAX_TRACK_SIZE}, got {size}")]
    InvalidTrackSize { group: &'static str, size: i32 },

    #[error("asset bundle name '{0}' must look like 'parent.child' using letters, digits and '_'")]
    InvalidBundleName(String),

    #[error("length must be a non-negative number of seconds, got {0}")]
    InvalidLength(f64),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Level metadata. The music bytes and their probed format travel with it but
/// are stored outside the JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub asset_bundle_name: String,
    pub name: String,
    pub description: String,
    pub level_authors: Vec<String>,
    pub composers: Vec<String>,
    pub difficulty: i32,
    pub left_track_size: i32,
    pub right_track_size: i32,
    pub note_appear_position: Vector3,
    pub bpm: f64,
    /// Music file extension including the dot, e.g. `.mp3`.
    pub ext: String,
    #[serde(rename = "length")]
    pub length_seconds: f64,
    #[serde(skip)]
    music: Arc<Vec<u8>>,
    #[serde(skip)]
    audio_info: Option<AudioInfo>,
}

impl Meta {
    pub fn music(&self) -> &[u8] {
        &self.music
    }

    pub fn audio_info(&self) -> Option<&AudioInfo> {
        self.audio_info.as_ref()
    }

    pub fn column(&self) -> i32 {
        self.left_track_size + self.right_track_size
    }

    /// Apply the value checks of [`MetaBuilder::build`] to metadata read back
    /// from disk.
    pub fn validate(&self) -> Result<(), MetaError> {
        check_bundle_name(&self.asset_bundle_name)?;
        check_difficulty(self.difficulty)?;
        check_track_sizes(self.left_track_size, self.right_track_size)?;
        check_bpm(self.bpm)?;
        if !(self.length_seconds >= 0.0 && self.length_seconds.is_finite()) {
            return Err(MetaError::InvalidLength(self.length_seconds));
        }
        Ok(())
    }

    /// Attach music read back from a project file and probe its format.
    pub fn attach_music(&mut self, music: Vec<u8>) -> Result<(), DecodeError> {
        let format = AudioFormat::from_extension(&self.ext)?;
        let info = kbm_decode::probe_bytes(&music, format)?;
        self.music = Arc::new(music);
        self.audio_info = Some(info);
        Ok(())
    }
}

/// Collects the fields of a [`Meta`] and validates them on `build`.
#[derive(Debug, Default, Clone)]
pub struct MetaBuilder {
    asset_bundle_name: Option<String>,
    name: Option<String>,
    description: Option<String>,
    level_authors: Vec<String>,
    composers: Vec<String>,
    difficulty: Option<i32>,
    track_sizes: Option<(i32, i32)>,
    note_appear_position: Option<Vector3>,
    bpm: Option<f64>,
    music: Option<(Vec<u8>, String)>,
    length_seconds: Option<f64>,
}

impl MetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_bundle_name(mut self, name: impl Into<String>) -> Self {
        self.asset_bundle_name = Some(name.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn level_author(mut self, author: impl Into<String>) -> Self {
        self.level_authors.push(author.into());
        self
    }

    pub fn composer(mut self, composer: impl Into<String>) -> Self {
        self.composers.push(composer.into());
        self
    }

    pub fn difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn track_sizes(mut self, left: i32, right: i32) -> Self {
        self.track_sizes = Some((left, right));
        self
    }

    pub fn note_appear_position(mut self, position: Vector3) -> Self {
        self.note_appear_position = Some(position);
        self
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    /// Music file contents and their extension (`.wav` or `.mp3`).
    pub fn music(mut self, bytes: Vec<u8>, ext: impl Into<String>) -> Self {
        self.music = Some((bytes, ext.into()));
        self
    }

    /// Override the length, which otherwise comes from the probed music.
    pub fn length_seconds(mut self, seconds: f64) -> Self {
        self.length_seconds = Some(seconds);
        self
    }

    pub fn build(self) -> Result<Meta, MetaError> {
        let asset_bundle_name = non_empty(self.asset_bundle_name, "asset bundle name")?;
        check_bundle_name(&asset_bundle_name)?;
        let name = non_empty(self.name, "name")?;
        let description = non_empty(self.description, "description")?;
        if self.level_authors.is_empty() {
            return Err(MetaError::Missing("level authors"));
        }
        if self.composers.is_empty() {
            return Err(MetaError::Missing("composers"));
        }

        let difficulty = self.difficulty.ok_or(MetaError::Missing("difficulty"))?;
        check_difficulty(difficulty)?;

        let (left, right) = self.track_sizes.ok_or(MetaError::Missing("track sizes"))?;
        check_track_sizes(left, right)?;

        let note_appear_position = self
            .note_appear_position
            .ok_or(MetaError::Missing("note appear position"))?;

        let bpm = self.bpm.ok_or(MetaError::Missing("bpm"))?;
        check_bpm(bpm)?;

        let (music, ext) = self.music.ok_or(MetaError::Missing("music"))?;
        let format = AudioFormat::from_extension(&ext)?;
        let info = kbm_decode::probe_bytes(&music, format)?;

        Ok(Meta {
            asset_bundle_name,
            name,
            description,
            level_authors: self.level_authors,
            composers: self.composers,
            difficulty,
            left_track_size: left,
            right_track_size: right,
            note_appear_position,
            bpm,
            ext: format.extension().to_string(),
            length_seconds: self.length_seconds.unwrap_or(info.duration_secs),
            music: Arc::new(music),
            audio_info: Some(info),
        })
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, MetaError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(MetaError::Missing(field))
}

fn check_difficulty(difficulty: i32) -> Result<(), MetaError> {
    if difficulty <= 0 {
        return Err(MetaError::InvalidDifficulty(difficulty));
    }
    Ok(())
}

fn check_track_sizes(left: i32, right: i32) -> Result<(), MetaError> {
    for (group, size) in [("left", left), ("right", right)] {
        if !(1..=MAX_TRACK_SIZE).contains(&size) {
            return Err(MetaError::InvalidTrackSize { group, size });
        }
    }
    Ok(())
}

fn check_bpm(bpm: f64) -> Result<(), MetaError> {
    if !(bpm > 0.0 && bpm.is_finite()) {
        return Err(MetaError::InvalidBpm(bpm));
    }
    Ok(())
}

fn check_bundle_name(name: &str) -> Result<(), MetaError> {
    if !is_valid_bundle_name(name) {
        return Err(MetaError::InvalidBundleName(name.to_string()));
    }
    Ok(())
}

fn is_valid_bundle_name(name: &str) -> bool {
    let part_ok = |part: &str| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    match name.split_once('.') {
        Some((parent, child)) => part_ok(parent) && part_ok(child),
        None => false,
    }
}

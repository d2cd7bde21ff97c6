use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::serde_helpers::Blob;
use crate::{Project, ProjectError, sheet_to_json};

pub(crate) const META_BLOB: &str = "meta";
pub(crate) const SHEET_BLOB: &str = "sheet";
pub(crate) const MUSIC_BLOB: &str = "music";

/// Write `project` as a MessagePack map of its meta, sheet and music blobs.
pub fn save_project(path: &Path, project: &Project) -> Result<(), ProjectError> {
    let (meta, sheet) = rayon::join(
        || serde_json::to_vec(project.meta()),
        || sheet_to_json(project.sheet()),
    );

    let mut blobs = BTreeMap::new();
    blobs.insert(META_BLOB, Blob(meta?));
    blobs.insert(SHEET_BLOB, Blob(sheet?));
    blobs.insert(MUSIC_BLOB, Blob(project.meta().music().to_vec()));

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    rmp_serde::encode::write(&mut writer, &blobs)?;
    writer.flush()?;

    log::info!(
        "saved project '{}' with {} notes to {}",
        project.meta().name,
        project.sheet().len(),
        path.display()
    );
    Ok(())
}

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::save::{META_BLOB, MUSIC_BLOB, SHEET_BLOB};
use crate::serde_helpers::Blob;
use crate::{Meta, Project, ProjectError, sheet_from_json};

fn load_blobs(path: &Path) -> Result<BTreeMap<String, Blob>, ProjectError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(rmp_serde::decode::from_read(reader)?)
}

fn take_blob(
    blobs: &mut BTreeMap<String, Blob>,
    name: &'static str,
) -> Result<Vec<u8>, ProjectError> {
    blobs
        .remove(name)
        .map(|blob| blob.0)
        .ok_or(ProjectError::MissingBlob(name))
}

/// Read only the metadata of a project file, without probing its music.
pub fn load_project_meta(path: &Path) -> Result<Meta, ProjectError> {
    let mut blobs = load_blobs(path)?;
    let meta = take_blob(&mut blobs, META_BLOB)?;
    let meta: Meta = serde_json::from_slice(&meta)?;
    meta.validate()?;
    Ok(meta)
}

pub fn load_project(path: &Path) -> Result<Project, ProjectError> {
    let mut blobs = load_blobs(path)?;
    let meta = take_blob(&mut blobs, META_BLOB)?;
    let sheet = take_blob(&mut blobs, SHEET_BLOB)?;
    let music = take_blob(&mut blobs, MUSIC_BLOB)?;

    let mut meta: Meta = serde_json::from_slice(&meta)?;
    meta.validate()?;
    let sheet = sheet_from_json(&sheet)?;
    meta.attach_music(music)?;

    let mut project = Project::new(meta, sheet)?;
    project.set_saving_path(path);
    log::info!(
        "loaded project '{}' with {} notes from {}",
        project.meta().name,
        project.sheet().len(),
        path.display()
    );
    Ok(project)
}

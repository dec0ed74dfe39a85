//! # Object Serialization Utilities
//!
//! Functions for saving and loading fitted objects (models, reports, anything
//! implementing `serde`'s traits). Uses `bincode` as the binary format.

use crate::error::PipelineError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

// --- Save Function ---

/// Serializes `object` to `path`, creating the parent directory first if needed.
///
/// # Arguments
/// * `path`: Target file. Missing parent directories are created; existing ones are fine.
/// * `object`: Any serializable value, e.g. a fitted [`Model`](crate::models::Model).
///
/// Any I/O or encoding failure is returned as a [`PipelineError`]; the file may
/// be left partially written.
pub fn save_object<P, T>(path: P, object: &T) -> Result<(), PipelineError>
where
    P: AsRef<Path>,
    T: Serialize + ?Sized,
{
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, object)?;
    // Dropping a BufWriter swallows write errors; flush explicitly.
    writer.flush()?;

    Ok(())
}

// --- Load Function ---

/// Reads back an object written by [`save_object`].
pub fn load_object<T, P>(path: P) -> Result<T, PipelineError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let object = bincode::deserialize_from(reader)?;
    Ok(object)
}

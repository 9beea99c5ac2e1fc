//! Model file loading.

use std::fs;
use std::path::Path;

use converge_core::StructureModel;
use tracing::debug;

use crate::error::Result;

/// Loads a structure model from a JSON file and freezes it.
///
/// # Errors
///
/// Fails when the file cannot be read, is not a valid model document, or
/// the model does not validate.
pub fn load_model(path: impl AsRef<Path>) -> Result<StructureModel> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut model: StructureModel = serde_json::from_str(&text)?;
    model.set_read_only()?;
    debug!(path = %path.display(), tables = model.tables().len(), "Model loaded");
    Ok(model)
}

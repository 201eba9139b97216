//! JSON dump of the harvested tree

use crate::model::Competition;
use crate::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Serializes the tree as pretty-printed JSON
pub fn render_dump(competition: &Competition) -> Result<String> {
    Ok(serde_json::to_string_pretty(competition)?)
}

/// Writes the tree to `output_path`, creating parent directories
///
/// # Arguments
///
/// * `competition` - The harvested tree
/// * `output_path` - Where the JSON file should be written
pub fn write_dump(competition: &Competition, output_path: &Path) -> Result<()> {
    let json = render_dump(competition)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;

    tracing::info!("Wrote result dump to {}", output_path.display());
    Ok(())
}

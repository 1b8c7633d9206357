use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// How one atom was placed by a geometry proposal, in internal coordinates.
///
/// `atom_index` is the particle index in the topology being grown. Distances are in
/// nanometers and angles in radians; the `logp_*` columns are the log-probabilities of
/// each coordinate and `log_detj` is `ln |r^2 sin(theta)|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub atom_index: usize,
    pub r: f64,
    pub theta: f64,
    pub phi: f64,
    pub logp_r: f64,
    pub logp_theta: f64,
    pub logp_phi: f64,
    pub log_detj: f64,
}

impl PlacementRecord {
    /// Total log-probability contributed by this placement.
    pub fn logp(&self) -> f64 {
        self.logp_r + self.logp_theta + self.logp_phi - self.log_detj
    }
}

#[derive(Debug, Error)]
pub enum PlacementWriteError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

pub fn write_placements<W: Write>(
    records: &[PlacementRecord],
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes placement records as a CSV file with a header row.
pub fn write_placements_csv(
    records: &[PlacementRecord],
    path: &Path,
) -> Result<(), PlacementWriteError> {
    let csv_error = |source| PlacementWriteError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let file = std::fs::File::create(path).map_err(|e| csv_error(csv::Error::from(e)))?;
    write_placements(records, file).map_err(csv_error)
}

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Multi-molecule file formats accepted for ligands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LigandFormat {
    Sdf,
    Mol2,
    Smiles,
}

impl LigandFormat {
    /// Determines the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, LigandFileError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "sdf" | "sd" => Ok(Self::Sdf),
            "mol2" => Ok(Self::Mol2),
            "smi" | "smiles" => Ok(Self::Smiles),
            _ => Err(LigandFileError::UnsupportedFormat(
                path.to_string_lossy().to_string(),
            )),
        }
    }
}

impl fmt::Display for LigandFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sdf => "SDF",
            Self::Mol2 => "MOL2",
            Self::Smiles => "SMILES",
        })
    }
}

/// One molecule of a ligand file, identified by its 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LigandEntry {
    pub index: usize,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum LigandFileError {
    #[error("Unsupported ligand file format: '{0}' (expected .sdf, .sd, .mol2 or .smi)")]
    UnsupportedFormat(String),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Ligand file '{0}' contains no molecules")]
    Empty(String),
}

/// Lists the molecules contained in a ligand file.
pub fn read_ligand_entries(path: &Path) -> Result<Vec<LigandEntry>, LigandFileError> {
    let format = LigandFormat::from_path(path)?;
    let io_error = |source| LigandFileError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let entries = parse_ligand_entries(BufReader::new(file), format).map_err(io_error)?;
    if entries.is_empty() {
        return Err(LigandFileError::Empty(path.to_string_lossy().to_string()));
    }
    Ok(entries)
}

pub fn parse_ligand_entries(
    reader: impl BufRead,
    format: LigandFormat,
) -> std::io::Result<Vec<LigandEntry>> {
    let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
    let titles = match format {
        LigandFormat::Sdf => sdf_titles(&lines),
        LigandFormat::Mol2 => mol2_titles(&lines),
        LigandFormat::Smiles => smiles_titles(&lines),
    };
    Ok(titles
        .into_iter()
        .enumerate()
        .map(|(index, title)| LigandEntry { index, title })
        .collect())
}

fn sdf_titles(lines: &[String]) -> Vec<String> {
    let mut titles = Vec::new();
    let mut record: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim_end() == "$$$$" {
            titles.push(record.first().map(|t| t.trim().to_string()).unwrap_or_default());
            record.clear();
        } else {
            record.push(line);
        }
    }
    // A final record without a terminator still counts if it holds anything.
    if record.iter().any(|line| !line.trim().is_empty()) {
        titles.push(record.first().map(|t| t.trim().to_string()).unwrap_or_default());
    }
    titles
}

fn mol2_titles(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == "@<TRIPOS>MOLECULE")
        .map(|(i, _)| lines.get(i + 1).map(|t| t.trim().to_string()).unwrap_or_default())
        .collect()
}

fn smiles_titles(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut tokens = line.split_whitespace();
            let smiles = tokens.next().unwrap_or_default();
            tokens.next().unwrap_or(smiles).to_string()
        })
        .collect()
}

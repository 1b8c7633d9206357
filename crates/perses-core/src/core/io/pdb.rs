use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::chain::ChainType;
use crate::core::models::ids::AtomId;
use crate::core::models::topology::Topology;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

const ANGSTROM_PER_NM: f64 = 10.0;

/// Records that precede the coordinates (HEADER, TITLE, REMARK, CRYST1, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    pub header_lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_int<T: std::str::FromStr>(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<T, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_coordinate(line: &str, line_num: usize, start: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, start + 8);
    value.parse::<f64>().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, start + 8),
            value: value.into(),
        },
    })
}

/// Formats an atom name into the four-character PDB name field.
fn format_atom_name(name: &str, element: &str) -> String {
    if name.len() < 4 && element.len() == 1 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Topology, Self::Metadata), Self::Error> {
        let mut topology = Topology::new();
        let mut metadata = PdbMetadata::default();
        let mut serial_map: HashMap<usize, AtomId> = HashMap::new();
        let mut conect: Vec<(usize, usize)> = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }
                    let serial: usize = parse_int(&line, line_num, 6, 11)?;
                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    let res_name = slice_and_trim(&line, 17, 20);
                    let chain_char = slice_and_trim(&line, 21, 22).chars().next().unwrap_or('A');
                    let res_seq: isize = parse_int(&line, line_num, 22, 26)?;
                    let x = parse_coordinate(&line, line_num, 30)?;
                    let y = parse_coordinate(&line, line_num, 38)?;
                    let z = parse_coordinate(&line, line_num, 46)?;
                    let element = slice_and_trim(&line, 76, 78);

                    if serial_map.contains_key(&serial) {
                        return Err(PdbError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            serial
                        )));
                    }

                    let chain_type = if record_type == "HETATM" {
                        ChainType::Hetero
                    } else {
                        ChainType::Polymer
                    };
                    let chain_id = topology.add_chain_with_type(chain_char, chain_type);
                    let residue_id = topology
                        .add_residue(chain_id, res_seq, res_name)
                        .ok_or_else(|| {
                            PdbError::Inconsistency(format!("Chain '{}' vanished", chain_char))
                        })?;
                    let position = Point3::new(x, y, z) / ANGSTROM_PER_NM;
                    let atom = Atom::new(name, element, residue_id, position);
                    let atom_id = topology.add_atom(residue_id, atom).ok_or_else(|| {
                        PdbError::Inconsistency(format!("Residue {} vanished", res_seq))
                    })?;
                    serial_map.insert(serial, atom_id);
                }
                "CONECT" => {
                    let origin: usize = parse_int(&line, line_num, 6, 11)?;
                    let mut start = 11;
                    while start < line.len() {
                        let field = slice_and_trim(&line, start, start + 5);
                        if !field.is_empty() {
                            let partner: usize = parse_int(&line, line_num, start, start + 5)?;
                            conect.push((origin.min(partner), origin.max(partner)));
                        }
                        start += 5;
                    }
                }
                "END" | "ENDMDL" => break,
                "HEADER" | "TITLE" | "COMPND" | "SOURCE" | "REMARK" | "CRYST1" | "EXPDTA"
                | "AUTHOR" => {
                    if serial_map.is_empty() {
                        metadata.header_lines.push(line.clone());
                    }
                }
                _ => {}
            }
        }

        if serial_map.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        conect.sort_unstable();
        conect.dedup();
        for (a1, a2) in conect {
            match (serial_map.get(&a1), serial_map.get(&a2)) {
                (Some(&id1), Some(&id2)) => {
                    topology.add_bond(id1, id2);
                }
                _ => warn!("Skipping CONECT {}-{}: unknown atom serial", a1, a2),
            }
        }

        Ok((topology, metadata))
    }

    fn write_to(
        topology: &Topology,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }

        let mut serials: HashMap<AtomId, usize> = HashMap::new();
        let mut serial = 1usize;

        for (_, chain) in topology.chains_iter() {
            let record_type = match chain.chain_type {
                ChainType::Polymer => "ATOM",
                ChainType::Hetero => "HETATM",
            };
            let mut last_residue = None;
            for &residue_id in chain.residues() {
                let Some(residue) = topology.residue(residue_id) else {
                    continue;
                };
                for &atom_id in residue.atoms() {
                    let Some(atom) = topology.atom(atom_id) else {
                        continue;
                    };
                    let position = atom.position * ANGSTROM_PER_NM;
                    writeln!(
                        writer,
                        "{:<6}{:>5} {} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                        record_type,
                        serial,
                        format_atom_name(&atom.name, &atom.element),
                        residue.name,
                        chain.id,
                        residue.number,
                        position.x,
                        position.y,
                        position.z,
                        1.0,
                        0.0,
                        atom.element.to_uppercase(),
                    )?;
                    serials.insert(atom_id, serial);
                    serial += 1;
                }
                last_residue = Some(residue);
            }
            if let Some(residue) = last_residue {
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {}{:>4}",
                    serial, residue.name, chain.id, residue.number
                )?;
                serial += 1;
            }
        }

        let mut partners: Vec<(usize, Vec<usize>)> = Vec::new();
        for atom_id in topology.ordered_atom_ids() {
            let Some(&origin) = serials.get(&atom_id) else {
                continue;
            };
            let mut bonded: Vec<usize> = topology
                .bonded_neighbors(atom_id)
                .unwrap_or_default()
                .iter()
                .filter_map(|id| serials.get(id).copied())
                .collect();
            if bonded.is_empty() {
                continue;
            }
            bonded.sort_unstable();
            partners.push((origin, bonded));
        }
        for (origin, bonded) in &partners {
            for chunk in bonded.chunks(4) {
                write!(writer, "CONECT{:>5}", origin)?;
                for partner in chunk {
                    write!(writer, "{:>5}", partner)?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_topology_to(topology: &Topology, writer: &mut impl Write) -> Result<(), Self::Error> {
        let metadata = PdbMetadata {
            header_lines: vec!["REMARK   1 GENERATED BY PERSES".to_string()],
        };
        Self::write_to(topology, &metadata, writer)
    }
}

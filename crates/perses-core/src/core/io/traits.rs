use crate::core::models::topology::Topology;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Common interface of structure file formats.
///
/// Implementors parse a [`Topology`] together with format-specific metadata and write
/// it back out. The path-based methods are provided on top of the reader/writer ones.
pub trait MolecularFile {
    /// Format-specific data that does not fit into a [`Topology`] (headers, remarks).
    type Metadata;

    type Error: Error + From<io::Error>;

    /// Reads a topology from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<(Topology, Self::Metadata), Self::Error>;

    /// Writes a topology and its metadata to a writer.
    fn write_to(
        topology: &Topology,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes a topology with default metadata.
    fn write_topology_to(topology: &Topology, writer: &mut impl Write) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<(Topology, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(
        topology: &Topology,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(topology, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_topology_to_path<P: AsRef<Path>>(
        topology: &Topology,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_topology_to(topology, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

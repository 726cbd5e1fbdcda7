//! File writers for exported hit collections.

use crate::Result;
use calohit_core::HitCollection;
use calohit_sim::EventHits;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Size of one hit in the binary format.
pub const BINARY_HIT_SIZE: usize = 38;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated text with a header line.
    Csv,
    /// Packed little-endian records.
    Binary,
    /// JSON array of events.
    Json,
}

impl OutputFormat {
    /// Picks the format from a file extension; unknown extensions are binary.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => OutputFormat::Csv,
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Binary,
        }
    }
}

/// Writer for hit collections.
pub struct HitFileWriter {
    writer: BufWriter<File>,
}

impl HitFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes `events` in the given format.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write(&mut self, format: OutputFormat, events: &[EventHits]) -> Result<()> {
        match format {
            OutputFormat::Csv => self.write_csv(events),
            OutputFormat::Binary => self.write_binary(events),
            OutputFormat::Json => self.write_json(events),
        }
    }

    /// Writes every collection of `events` as CSV, energies in GeV.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_csv(&mut self, events: &[EventHits]) -> Result<()> {
        writeln!(
            self.writer,
            "collection,event,cell,time,track,depth,em_gev,had_gev"
        )?;

        for collection in events.iter().flat_map(EventHits::iter) {
            self.write_collection_csv(collection)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    fn write_collection_csv(&mut self, collection: &HitCollection) -> Result<()> {
        for hit in collection.iter() {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{}",
                collection.label,
                hit.event,
                hit.cell.raw(),
                hit.time,
                hit.track,
                hit.depth.0,
                hit.em,
                hit.had
            )?;
        }
        Ok(())
    }

    /// Writes every hit of `events` as binary data.
    ///
    /// Format: for each hit u32 (event) + u32 (cell) + f64 (time) +
    /// i32 (track) + u16 (depth) + f64 (em) + f64 (had), little-endian.
    /// Total: 38 bytes per hit. Collections follow each other in EB, EE, HC
    /// order per event.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_binary(&mut self, events: &[EventHits]) -> Result<()> {
        for hit in events
            .iter()
            .flat_map(EventHits::iter)
            .flat_map(HitCollection::iter)
        {
            self.writer.write_all(&hit.event.to_le_bytes())?;
            self.writer.write_all(&hit.cell.raw().to_le_bytes())?;
            self.writer.write_all(&hit.time.to_le_bytes())?;
            self.writer.write_all(&hit.track.to_le_bytes())?;
            self.writer.write_all(&hit.depth.0.to_le_bytes())?;
            self.writer.write_all(&hit.em.to_le_bytes())?;
            self.writer.write_all(&hit.had.to_le_bytes())?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes `events` as a JSON array.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write_json(&mut self, events: &[EventHits]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, events)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calohit_core::{CaloHit, Category, CellId, DepthCode};
    use tempfile::NamedTempFile;

    fn events() -> Vec<EventHits> {
        let mut eb = HitCollection::with_capacity("EcalHitsEB", Category::Eb, 4, 2);
        eb.hits.push(CaloHit {
            event: 4,
            cell: CellId(500),
            em: 5.0,
            had: 0.0,
            time: 4.0,
            track: 1,
            depth: DepthCode(0x6c),
        });
        eb.hits.push(CaloHit {
            event: 4,
            cell: CellId(501),
            em: 0.25,
            had: 0.5,
            time: 7.0,
            track: 2,
            depth: DepthCode(0x28),
        });
        let ee = HitCollection::with_capacity("EcalHitsEE", Category::Ee, 4, 0);
        let mut hc = HitCollection::with_capacity("HcalHits", Category::Hc, 4, 1);
        hc.hits.push(CaloHit {
            event: 4,
            cell: CellId(11_304),
            em: 0.0,
            had: 0.002,
            time: 12.0,
            track: 9,
            depth: DepthCode::NONE,
        });
        vec![EventHits {
            event: 4,
            collections: [eb, ee, hc],
        }]
    }

    #[test]
    fn test_write_hits_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = HitFileWriter::create(file.path()).unwrap();

        writer.write_csv(&events()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "collection,event,cell,time,track,depth,em_gev,had_gev");
        assert_eq!(lines[1], "EcalHitsEB,4,500,4,1,108,5,0");
        assert_eq!(lines[2], "EcalHitsEB,4,501,7,2,40,0.25,0.5");
        assert_eq!(lines[3], "HcalHits,4,11304,12,9,0,0,0.002");
    }

    #[test]
    fn test_write_hits_binary() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = HitFileWriter::create(file.path()).unwrap();

        writer.write_binary(&events()).unwrap();

        let data = std::fs::read(file.path()).unwrap();
        // 4 (u32) + 4 (u32) + 8 (f64) + 4 (i32) + 2 (u16) + 8 (f64) + 8 (f64) = 38 bytes
        assert_eq!(data.len(), 3 * BINARY_HIT_SIZE);
        assert_eq!(&data[0..4], &4u32.to_le_bytes());
        assert_eq!(&data[4..8], &500u32.to_le_bytes());
        assert_eq!(&data[20..22], &0x6cu16.to_le_bytes());
        assert_eq!(&data[22..30], &5.0f64.to_le_bytes());
        let last = &data[2 * BINARY_HIT_SIZE..];
        assert_eq!(&last[4..8], &11_304u32.to_le_bytes());
    }

    #[test]
    fn test_write_hits_json() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = HitFileWriter::create(file.path()).unwrap();

        let events = events();
        writer.write_json(&events).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let parsed: Vec<EventHits> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, events);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_path("hits.csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path("hits.JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_path("hits.bin"), OutputFormat::Binary);
        assert_eq!(OutputFormat::from_path("hits"), OutputFormat::Binary);
    }
}

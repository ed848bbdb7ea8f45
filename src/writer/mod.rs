//! FAMOS file writer.
//!
//! Saving is a two-step process. First the complete key skeleton is written:
//! every metadata key plus one `CS` key per raw block whose payload region is
//! reserved and zero-filled. Then a caller-supplied closure receives a
//! [`DataWriter`] and fills those regions with sample values. Finally the key
//! group's "closed" flag is patched to `1`, so a file whose writer died
//! halfway is recognisable as such.
//!
//! # Writing Workflow
//!
//! 1. Build a [`FamosHeader`] with groups, fields and components
//! 2. Add a [`RawBlock`](crate::RawBlock) and lay out buffers with
//!    [`align_buffers()`](FamosHeader::align_buffers)
//! 3. Call [`save()`](FamosHeader::save) and write values in the closure
//!
//! # Example
//!
//! ```no_run
//! use famos_rs::{
//!     BufferAlignment, CalibrationInfo, Channel, Component, DataType, FamosHeader, Field,
//!     FieldType, RawBlock, Result, SaveOptions,
//! };
//!
//! fn write_temperature() -> Result<()> {
//!     let channel = Channel::new("Temperature");
//!     let component = Component::analog(DataType::F64, 3, CalibrationInfo::with_unit("°C"))
//!         .with_channel(channel.clone());
//!     let component_id = component.id;
//!
//!     let mut header = FamosHeader::new();
//!     header.add_channel(&channel);
//!     header.fields.push(Field::new(FieldType::EquidistantTime).with_component(component));
//!     let block = RawBlock::new();
//!     let block_id = block.id;
//!     header.raw_blocks.push(block);
//!     header.align_buffers(block_id, BufferAlignment::Continuous)?;
//!
//!     header.save("temperature.dat", &SaveOptions::default(), |data| {
//!         data.write_single(component_id, &[21.5f64, 21.7, 22.0])
//!     })
//! }
//! ```

use crate::keys::{CodePageCodec, KeyWriter, Placeholder, TextCodec};
use crate::model::{EntityId, FamosHeader};
use crate::reader::DEFAULT_BUFFER_CAPACITY;
use crate::types::Sample;
use crate::{Error, Result, resolve};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

mod io;

/// Bytes of gapped values held back before they are written out.
const PENDING_LIMIT: usize = 4 * 1024 * 1024;

pub use io::{FamosWrite, FileWriter, SaveMode, StreamWriter, VecWriter};

/// Settings for [`FamosHeader::save`].
#[derive(Clone)]
pub struct SaveOptions {
    pub mode: SaveMode,
    /// Size of the `BufWriter` wrapped around the file.
    pub buffer_capacity: usize,
    /// Terminate each key with CRLF, as imc software does.
    pub line_breaks: bool,
    pub codec: Arc<dyn TextCodec + Send + Sync>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            mode: SaveMode::Overwrite,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            line_breaks: true,
            codec: Arc::new(CodePageCodec),
        }
    }
}

impl SaveOptions {
    pub fn with_mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_line_breaks(mut self, line_breaks: bool) -> Self {
        self.line_breaks = line_breaks;
        self
    }
}

impl core::fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SaveOptions")
            .field("mode", &self.mode)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("line_breaks", &self.line_breaks)
            .finish_non_exhaustive()
    }
}

/// Writes sample values into the reserved raw block regions.
pub struct DataWriter<'a, W: FamosWrite> {
    sink: &'a mut W,
    header: &'a FamosHeader,
    raw_blocks: HashMap<EntityId, Placeholder>,
    pending: PendingRuns,
}

impl<W: FamosWrite> DataWriter<'_, W> {
    /// The document being saved, with freshly assigned indices.
    pub fn header(&self) -> &FamosHeader {
        self.header
    }

    /// Write a component's values from its first value on.
    pub fn write_single<T: Sample>(&mut self, component: EntityId, values: &[T]) -> Result<()> {
        self.write_single_at(component, 0, values)
    }

    /// Write `values` starting at value index `start`.
    ///
    /// `T` must match the component's data type and the values must fit
    /// into its buffer.
    pub fn write_single_at<T: Sample>(
        &mut self,
        component: EntityId,
        start: u64,
        values: &[T],
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let location = self.header.locate(component, start, values.len() as u64)?;
        if location.data_type != T::DATA_TYPE {
            return Err(Error::InvalidArgument(format!(
                "component {component} stores {:?}, not {:?}",
                location.data_type,
                T::DATA_TYPE
            )));
        }
        let placeholder = *self.raw_blocks.get(&location.raw_block).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "raw block {} was not reserved",
                location.raw_block
            ))
        })?;

        let range = location.range;
        let mut bytes = Vec::with_capacity(values.len() * range.value_size as usize);
        if range.is_contiguous() {
            for value in values {
                value.write_le(&mut bytes);
            }
            self.pending.flush(&mut *self.sink)?;
            return placeholder.fill(&mut *self.sink, range.file_offset, &bytes);
        }

        // Check the last value first; offsets grow with the index.
        placeholder.absolute(
            range.value_offset(values.len() as u64 - 1),
            range.value_size,
        )?;
        for (i, value) in values.iter().enumerate() {
            bytes.clear();
            value.write_le(&mut bytes);
            let offset = placeholder.absolute(range.value_offset(i as u64), range.value_size)?;
            if !self.pending.insert(offset, &bytes) {
                self.pending.flush(&mut *self.sink)?;
                self.pending.insert(offset, &bytes);
            }
        }
        if self.pending.bytes >= PENDING_LIMIT {
            self.pending.flush(&mut *self.sink)?;
        }
        Ok(())
    }

    /// Write out values still held back.
    fn finish(&mut self) -> Result<()> {
        self.pending.flush(&mut *self.sink)
    }
}

/// Gapped values waiting to be written.
///
/// Values of interlaced components are spread across rows. Writing each one
/// on its own means two seeks per value, so they are collected here and
/// adjacent values merged into runs that are patched in one go.
#[derive(Debug, Default)]
struct PendingRuns {
    /// Runs keyed by absolute start offset; never overlapping.
    runs: BTreeMap<u64, Vec<u8>>,
    bytes: usize,
}

impl PendingRuns {
    /// Queue `bytes` at `offset`. Returns `false`, queueing nothing, if they
    /// overlap a queued run.
    fn insert(&mut self, offset: u64, bytes: &[u8]) -> bool {
        let end = offset + bytes.len() as u64;
        if let Some((start, run)) = self.runs.range(..=offset).next_back() {
            if start + run.len() as u64 > offset {
                return false;
            }
        }
        if let Some((start, _)) = self.runs.range(offset..).next() {
            if *start < end {
                return false;
            }
        }

        let adjacent = self
            .runs
            .range(..offset)
            .next_back()
            .filter(|(start, run)| **start + run.len() as u64 == offset)
            .map(|(start, _)| *start);
        let (start, mut run) = adjacent
            .and_then(|start| self.runs.remove_entry(&start))
            .unwrap_or((offset, Vec::new()));
        run.extend_from_slice(bytes);
        if let Some(next) = self.runs.remove(&end) {
            run.extend_from_slice(&next);
        }
        self.runs.insert(start, run);
        self.bytes += bytes.len();
        true
    }

    fn flush<W: FamosWrite + ?Sized>(&mut self, sink: &mut W) -> Result<()> {
        if !self.runs.is_empty() {
            log::trace!("patching {} runs of gapped values", self.runs.len());
        }
        for (offset, run) in std::mem::take(&mut self.runs) {
            sink.patch(offset, &run)?;
        }
        self.bytes = 0;
        Ok(())
    }
}

impl FamosHeader {
    /// Validate, renumber and write the document to `path`.
    ///
    /// `write_data` runs after the key skeleton is on disk and fills the raw
    /// blocks through the [`DataWriter`].
    pub fn save<F>(&mut self, path: impl AsRef<Path>, options: &SaveOptions, write_data: F) -> Result<()>
    where
        F: FnOnce(&mut DataWriter<'_, FileWriter>) -> Result<()>,
    {
        let path = path.as_ref();
        log::debug!("saving {}", path.display());
        let mut sink = FileWriter::create(path, options.mode, options.buffer_capacity)?;
        self.save_to(&mut sink, options, write_data)
    }

    /// Like [`save`](Self::save), writing to any seekable sink.
    pub fn save_to<W, F>(&mut self, sink: &mut W, options: &SaveOptions, write_data: F) -> Result<()>
    where
        W: FamosWrite,
        F: FnOnce(&mut DataWriter<'_, W>) -> Result<()>,
    {
        self.validate()?;
        resolve::before_save(self)?;

        let skeleton = {
            let mut keys = KeyWriter::new(&mut *sink, &*options.codec)
                .with_line_breaks(options.line_breaks);
            self.write_skeleton(&mut keys)?
        };
        log::debug!(
            "wrote key skeleton, {} raw blocks reserved",
            skeleton.raw_blocks.len()
        );

        let mut data = DataWriter {
            sink: &mut *sink,
            header: &*self,
            raw_blocks: skeleton.raw_blocks.into_iter().collect(),
            pending: PendingRuns::default(),
        };
        write_data(&mut data)?;
        data.finish()?;

        sink.patch(skeleton.closed_flag, b"1")?;
        sink.flush()
    }
}

//! Opening FAMOS files and reading sample values.

use crate::keys::{CodePageCodec, KeyReader, TextCodec};
use crate::model::{ComponentRole, DataType, EntityId, FamosHeader, FieldType};
use crate::types::ChannelValues;
use crate::{Error, Result, resolve};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Default read buffer, matching the writer's.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1 << 20;

/// Settings for [`FamosFile::open_with`].
#[derive(Clone)]
pub struct OpenOptions {
    /// Size of the `BufReader` wrapped around the file.
    pub buffer_capacity: usize,
    /// Converts stored strings according to the file's code page.
    pub codec: Arc<dyn TextCodec + Send + Sync>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            codec: Arc::new(CodePageCodec),
        }
    }
}

impl core::fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpenOptions")
            .field("buffer_capacity", &self.buffer_capacity)
            .finish_non_exhaustive()
    }
}

/// Values of one component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentData {
    pub role: ComponentRole,
    pub data_type: DataType,
    pub values: ChannelValues,
}

/// Values of a channel together with its field's secondary component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelData {
    pub name: String,
    pub field_type: FieldType,
    /// The channel's own component first, then the secondary component if
    /// the channel sits on a primary one.
    pub components: Vec<ComponentData>,
}

impl ChannelData {
    /// The channel's own values.
    pub fn values(&self) -> Option<&ChannelValues> {
        self.components.first().map(|c| &c.values)
    }
}

/// A parsed FAMOS file with random access to its sample data.
///
/// Only metadata is parsed when opening; sample bytes are read on demand.
pub struct FamosFile<R = BufReader<File>> {
    reader: R,
    header: FamosHeader,
}

impl FamosFile<BufReader<File>> {
    /// Open and parse a `.dat` file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use famos_rs::{FamosFile, Result};
    ///
    /// fn main() -> Result<()> {
    ///     let mut file = FamosFile::open("measurement.dat")?;
    ///     for data in file.read_all()? {
    ///         println!("{}: {:?}", data.name, data.values().map(|v| v.len()));
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &OpenOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening {}", path.display());
        let file = File::open(path)?;
        Self::from_reader_with(BufReader::with_capacity(options.buffer_capacity, file), options)
    }
}

impl<R: BufRead + Seek> FamosFile<R> {
    /// Parse a key stream starting at the reader's current position.
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, &OpenOptions::default())
    }

    pub fn from_reader_with(reader: R, options: &OpenOptions) -> Result<Self> {
        let mut keys = KeyReader::new(reader, &*options.codec)?;
        let mut header = FamosHeader::parse(&mut keys)?;
        resolve::after_load(&mut header)?;
        header.validate()?;
        log::debug!(
            "parsed {} groups, {} fields, {} raw blocks",
            header.groups.len(),
            header.fields.len(),
            header.raw_blocks.len()
        );
        Ok(Self {
            reader: keys.into_inner(),
            header,
        })
    }

    pub fn header(&self) -> &FamosHeader {
        &self.header
    }

    /// Give up data access and keep the document.
    pub fn into_header(self) -> FamosHeader {
        self.header
    }

    /// Read `length` values (0 for all remaining) of a component from `start`.
    pub fn read_component(
        &mut self,
        component: EntityId,
        start: u64,
        length: u64,
    ) -> Result<ComponentData> {
        let location = self.header.locate(component, start, length)?;
        let raw_block = self
            .header
            .raw_block(location.raw_block)
            .and_then(|b| b.file_offset)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "raw block {} was not read from this file",
                    location.raw_block
                ))
            })?;

        let range = location.range;
        let bytes = self.read_range(raw_block + range.file_offset, range.byte_length())?;
        let size = range.value_size as usize;
        let values: Vec<&[u8]> = if range.is_contiguous() {
            bytes.chunks_exact(size).collect()
        } else {
            let row = range.row_size as usize;
            (0..range.value_count as usize)
                .map(|i| &bytes[i * row..i * row + size])
                .collect()
        };

        Ok(ComponentData {
            role: location.role,
            data_type: location.data_type,
            values: ChannelValues::decode(location.data_type, &values)?,
        })
    }

    /// Read values of one channel and, for a primary component, the field's
    /// secondary component over the same range.
    pub fn read_single(&mut self, channel: EntityId, start: u64, length: u64) -> Result<ChannelData> {
        let (field, component, found) = self.header.channel(channel).ok_or_else(|| {
            Error::InvalidArgument(format!("channel {channel} is not part of the header"))
        })?;
        let name = found.name.clone();
        let field_type = field.field_type;
        let mut components = vec![component.id];
        if component.role == ComponentRole::Primary {
            if let Some(secondary) = field.secondary_component() {
                components.push(secondary.id);
            }
        }

        let components = components
            .into_iter()
            .map(|id| self.read_component(id, start, length))
            .collect::<Result<Vec<_>>>()?;
        Ok(ChannelData {
            name,
            field_type,
            components,
        })
    }

    /// Read every channel in document order.
    pub fn read_all(&mut self) -> Result<Vec<ChannelData>> {
        let channels: Vec<EntityId> = self
            .header
            .components()
            .flat_map(|c| c.channels.iter().map(|ch| ch.id))
            .collect();
        channels
            .into_iter()
            .map(|id| self.read_single(id, 0, 0))
            .collect()
    }

    fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let length = usize::try_from(length)
            .map_err(|_| Error::InvalidArgument(format!("{length} bytes exceed memory")))?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; length];
        match self.reader.read_exact(&mut bytes) {
            Ok(()) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(Error::TruncatedStream { position: offset })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#![forbid(unsafe_code)]

//! # famos-rs
//!
//! A Rust library for reading and writing imc FAMOS `.dat` measurement files.
//!
//! A FAMOS file is a stream of ASCII-framed records ("keys") of the form
//! `|XX,version,length,payload;`. Metadata keys describe groups, data fields
//! and components; raw sample bytes live inside `CS` keys and are addressed
//! through buffer and pack descriptions.
//!
//! ## Features
//!
//! - **Reading**: Parse a file into a [`FamosHeader`] document and read typed
//!   sample values per channel or component
//! - **Writing**: Build a document in memory and save it, streaming sample
//!   values into reserved raw block regions
//! - **Validation**: Whole-document consistency checks after every load and
//!   before every save
//! - **Layout**: Byte addressing of contiguous and gapped value layouts, and
//!   continuous or interlaced buffer alignment
//! - **JSON**: Export and import of document metadata (`serde` feature)
//!
//! ## Limitations
//!
//! Compressed raw blocks, ring buffers, masked values, grouped values with
//! gaps, digital components and event-split components are recognised but
//! their sample data cannot be read or written; such requests fail with
//! [`Error::UnsupportedFeature`].
//!
//! ## Quick Start
//!
//! ### Reading a FAMOS file
//!
//! ```no_run
//! use famos_rs::{FamosFile, Result};
//!
//! fn main() -> Result<()> {
//!     let mut file = FamosFile::open("recording.dat")?;
//!
//!     for group in &file.header().groups {
//!         println!("Group: {} ({} channels)", group.name, group.channels.len());
//!     }
//!
//!     for data in file.read_all()? {
//!         let count = data.values().map_or(0, |v| v.len());
//!         println!("  {}: {} samples", data.name, count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Writing a FAMOS file
//!
//! ```no_run
//! use famos_rs::{
//!     BufferAlignment, CalibrationInfo, Channel, Component, DataType, FamosHeader, Field,
//!     FieldType, Group, RawBlock, Result, SaveOptions, XAxisScaling,
//! };
//!
//! fn main() -> Result<()> {
//!     let speed = Channel::new("Speed");
//!     let component = Component::analog(DataType::F32, 4, CalibrationInfo::with_unit("rpm"))
//!         .with_x_scaling(XAxisScaling::new(0.01, "s"))
//!         .with_channel(speed.clone());
//!     let component_id = component.id;
//!
//!     let mut group = Group::new("Engine");
//!     group.add_channel(&speed);
//!
//!     let mut header = FamosHeader::new();
//!     header.groups.push(group);
//!     header.fields.push(Field::new(FieldType::EquidistantTime).with_component(component));
//!
//!     let block = RawBlock::new();
//!     let block_id = block.id;
//!     header.raw_blocks.push(block);
//!     header.align_buffers(block_id, BufferAlignment::Continuous)?;
//!
//!     header.save("engine.dat", &SaveOptions::default(), |data| {
//!         data.write_single(component_id, &[800.0f32, 810.0, 845.5, 900.0])
//!     })
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`keys`] | Key framing, field codec and text code pages |
//! | [`model`] | The document entities |
//! | [`layout`] | Value addressing and buffer alignment |
//! | [`writer`] | Saving with [`DataWriter`] and output sinks |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], which is an alias for
//! `core::result::Result<T, Error>`. Any error aborts the whole open or save
//! call; there is no partially recovered document.

pub mod error;
pub mod keys;
pub mod layout;
pub mod model;
pub mod writer;

#[cfg(feature = "serde")]
mod json;
mod reader;
mod resolve;
mod types;
mod validate;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};
pub use keys::{CodePageCodec, TextCodec};
pub use layout::ByteRange;
pub use model::{
    Buffer, BufferAlignment, BufferInfo, CalibrationInfo, Channel, Component, ComponentKind,
    ComponentRole, CompressionType, CustomKey, DataType, DisplayInfo, EntityId, Event, EventInfo,
    EventReference, FamosHeader, Field, FieldType, Group, LanguageInfo, Origin, OriginInfo,
    PackInfo, Property, PropertyInfo, PropertyType, RawBlock, SingleValue, Text, TimeMode,
    TriggerTime, XAxisScaling, ZAxisScaling,
};
pub use reader::{ChannelData, ComponentData, DEFAULT_BUFFER_CAPACITY, FamosFile, OpenOptions};
pub use types::{ChannelValues, Sample};
pub use writer::{DataWriter, FileWriter, SaveMode, SaveOptions, VecWriter};

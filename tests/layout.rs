use famos_rs::layout::{byte_range_for, max_value_count, row_size, value_position};
use famos_rs::{
    Buffer, BufferAlignment, CalibrationInfo, Channel, ChannelValues, Component, DataType, Error,
    FamosFile, FamosHeader, Field, FieldType, PackInfo, RawBlock, Result, SaveOptions, VecWriter,
};
use std::io::Cursor;

fn i32_pack(offset: u64, group_size: u64, gap_size: u64) -> PackInfo {
    PackInfo {
        offset,
        group_size,
        gap_size,
        ..PackInfo::new(DataType::I32)
    }
}

#[test]
fn gapped_rows_count_a_trailing_group() {
    let pack = i32_pack(0, 1, 4);
    assert_eq!(row_size(&pack), 8);
    assert_eq!(value_position(&pack, 3), 24);

    // 3 full rows plus one value without its gap.
    let buffer = Buffer::new(28);
    assert_eq!(max_value_count(&pack, &buffer).unwrap(), 4);

    // A partial row too short for a value does not count.
    let buffer = Buffer::new(26);
    assert_eq!(max_value_count(&pack, &buffer).unwrap(), 3);
}

#[test]
fn pack_offset_shifts_every_value() {
    let pack = i32_pack(4, 1, 0);
    let mut buffer = Buffer::new(20);
    buffer.raw_block_offset = 8;
    let range = byte_range_for(&pack, &buffer, 100, 1, 2).unwrap();
    assert_eq!(range.file_offset, 100 + 8 + 4 + 4);
    assert_eq!(range.value_count, 2);
    assert_eq!(range.byte_length(), 8);
    assert!(range.is_contiguous());
}

#[test]
fn offsets_past_the_address_space_are_rejected() {
    let pack = i32_pack(0, 1, 0);
    let mut buffer = Buffer::new(20);
    buffer.raw_block_offset = u64::MAX - 8;
    assert!(matches!(
        byte_range_for(&pack, &buffer, 100, 0, 0),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn gapped_range_addresses_each_value() {
    let pack = i32_pack(0, 1, 8);
    let buffer = Buffer::new(36);
    let range = byte_range_for(&pack, &buffer, 0, 1, 0).unwrap();
    assert_eq!(range.value_count, 2);
    assert!(!range.is_contiguous());
    assert_eq!(range.value_offset(0), 12);
    assert_eq!(range.value_offset(1), 24);
    assert_eq!(range.byte_length(), 16);
}

#[test]
fn unreadable_layouts_are_rejected() {
    let buffer = Buffer::new(64);

    let grouped = i32_pack(0, 2, 4);
    assert!(matches!(
        byte_range_for(&grouped, &buffer, 0, 0, 0),
        Err(Error::UnsupportedFeature(_))
    ));

    let masked = PackInfo {
        mask: 0x00FF,
        ..i32_pack(0, 1, 0)
    };
    assert!(matches!(
        byte_range_for(&masked, &buffer, 0, 0, 0),
        Err(Error::UnsupportedFeature(_))
    ));

    let mut ring = Buffer::new(64);
    ring.offset = 16;
    assert!(matches!(
        byte_range_for(&i32_pack(0, 1, 0), &ring, 0, 0, 0),
        Err(Error::UnsupportedFeature(_))
    ));
}

fn two_channel_header(count: u64) -> (FamosHeader, [famos_rs::EntityId; 2], famos_rs::EntityId) {
    let a = Channel::new("A");
    let b = Channel::new("B");
    let first = Component::analog(DataType::I32, count, CalibrationInfo::default())
        .with_channel(a.clone());
    let second = Component::analog(DataType::F64, count, CalibrationInfo::default())
        .with_channel(b.clone());
    let ids = [first.id, second.id];

    let mut header = FamosHeader::new();
    header.add_channel(&a);
    header.add_channel(&b);
    header.fields.push(
        Field::new(FieldType::EquidistantTime)
            .with_component(first)
            .with_component(second),
    );
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    (header, ids, block_id)
}

#[test]
fn continuous_alignment_is_idempotent() -> Result<()> {
    let (mut header, [first, second], block) = two_channel_header(5);
    header.align_buffers(block, BufferAlignment::Continuous)?;
    let once = header.clone();
    header.align_buffers(block, BufferAlignment::Continuous)?;
    assert_eq!(header, once);

    assert_eq!(header.raw_blocks[0].length, 5 * 4 + 5 * 8);
    let second_buffer = &header.component(second).unwrap().1.buffer_info.buffers[0];
    assert_eq!(second_buffer.raw_block_offset, 20);
    assert_eq!(header.max_value_count(first)?, 5);
    assert_eq!(header.max_value_count(second)?, 5);
    Ok(())
}

#[test]
fn interlaced_alignment_shares_one_buffer_window() -> Result<()> {
    let (mut header, [first, second], block) = two_channel_header(3);
    header.align_buffers(block, BufferAlignment::Interlaced)?;
    assert_eq!(header.raw_blocks[0].length, 3 * 12);

    let pack = &header.component(second).unwrap().1.pack_info;
    assert_eq!(pack.offset, 4);
    assert_eq!(pack.gap_size, 4);
    assert_eq!(header.max_value_count(first)?, 3);
    assert_eq!(header.max_value_count(second)?, 3);
    Ok(())
}

#[test]
fn interlaced_alignment_needs_equal_lengths() {
    let (mut header, [_, second], block) = two_channel_header(3);
    let component = header.fields[0]
        .components
        .iter_mut()
        .find(|c| c.id == second)
        .unwrap();
    let buffer = &mut component.buffer_info.buffers[0];
    buffer.length = 16;
    buffer.consumed_bytes = 16;
    assert!(matches!(
        header.align_buffers(block, BufferAlignment::Interlaced),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn alignment_needs_a_known_raw_block() {
    let (mut header, _, _) = two_channel_header(3);
    let stranger = RawBlock::new();
    assert!(matches!(
        header.align_buffers(stranger.id, BufferAlignment::Continuous),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn realigned_layout_keeps_every_value() -> Result<()> {
    let (mut header, [first, second], block) = two_channel_header(4);
    header.align_buffers(block, BufferAlignment::Interlaced)?;
    header.align_buffers(block, BufferAlignment::Continuous)?;
    assert_eq!(header.max_value_count(first)?, 4);
    assert_eq!(header.max_value_count(second)?, 4);

    for mode in [BufferAlignment::Interlaced, BufferAlignment::Continuous] {
        header.align_buffers(block, mode)?;
        let mut sink = VecWriter::new();
        header.save_to(&mut sink, &SaveOptions::default(), |data| {
            data.write_single(first, &[1i32, -2, 3, -4])?;
            data.write_single(second, &[0.5f64, 1.5, 2.5, 3.5])
        })?;

        let mut file = FamosFile::from_reader(Cursor::new(sink.into_inner()))?;
        let all = file.read_all()?;
        assert_eq!(all[0].values(), Some(&ChannelValues::I32(vec![1, -2, 3, -4])));
        assert_eq!(
            all[1].values(),
            Some(&ChannelValues::F64(vec![0.5, 1.5, 2.5, 3.5]))
        );
    }
    Ok(())
}

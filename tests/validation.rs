use famos_rs::{
    BufferAlignment, CalibrationInfo, Channel, Component, ComponentRole, CustomKey, DataType,
    DisplayInfo, Error, FamosHeader, Field, FieldType, Group, RawBlock, Result, SaveOptions,
    SingleValue, Text, TriggerTime, VecWriter, XAxisScaling,
};

/// One grouped channel on one component, laid out in one raw block.
fn valid_header() -> FamosHeader {
    let channel = Channel::new("Voltage");
    let mut group = Group::new("Supply");
    group.add_channel(&channel);

    let mut header = FamosHeader::new();
    header.groups.push(group);
    header.fields.push(
        Field::new(FieldType::EquidistantTime).with_component(
            Component::analog(DataType::F32, 8, CalibrationInfo::with_unit("V"))
                .with_channel(channel),
        ),
    );
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header
        .align_buffers(block_id, BufferAlignment::Continuous)
        .unwrap();
    header
}

fn assert_violation(result: Result<()>) {
    match result {
        Err(Error::InvariantViolation(_)) => {}
        other => panic!("expected an invariant violation, got {other:?}"),
    }
}

#[test]
fn baseline_is_valid() {
    valid_header().validate().unwrap();
}

#[test]
fn group_added_twice() {
    let mut header = valid_header();
    let group = Group::new("Twice");
    header.groups.push(group.clone());
    header.groups.push(group);
    assert_violation(header.validate());
}

#[test]
fn custom_key_added_twice() {
    let mut header = valid_header();
    let key = CustomKey::new("Operator", b"ada".to_vec());
    header.custom_keys.push(key.clone());
    header.custom_keys.push(key);
    assert_violation(header.validate());
}

#[test]
fn text_in_group_and_top_level() {
    let mut header = valid_header();
    let text = Text::new("Note", "calibrated");
    header.groups[0].add_text(text.clone());
    header.texts.push(text);
    assert_violation(header.validate());
}

#[test]
fn single_value_in_two_groups() {
    let mut header = valid_header();
    let value = SingleValue::new("Gain", 2.0, "");
    let mut other = Group::new("Other");
    other.add_single_value(value.clone());
    header.groups[0].add_single_value(value);
    header.groups.push(other);
    assert_violation(header.validate());
}

#[test]
fn channel_listed_by_group_and_top_level() {
    let mut header = valid_header();
    let id = header.groups[0].channels[0];
    header.channels.push(id);
    assert_violation(header.validate());
}

#[test]
fn channel_owned_by_two_components() {
    let mut header = valid_header();
    let channel = header.fields[0].components[0].channels[0].clone();
    let mut component = Component::analog(DataType::F32, 8, CalibrationInfo::default());
    component.channels.push(channel);
    header.fields[0].components.push(component);
    assert_violation(header.validate());
}

#[test]
fn channel_without_owner_list() {
    let mut header = valid_header();
    header.groups[0].channels.clear();
    assert_violation(header.validate());
}

#[test]
fn raw_block_added_twice() {
    let mut header = valid_header();
    let block = header.raw_blocks[0].clone();
    header.raw_blocks.push(block);
    assert_violation(header.validate());
}

#[test]
fn buffer_must_fit_its_raw_block() {
    let mut header = valid_header();
    header.raw_blocks[0].length -= 1;
    assert_violation(header.validate());
}

#[test]
fn unplaced_buffer_is_rejected() {
    let mut header = valid_header();
    header.fields[0].components[0].buffer_info.buffers[0].raw_block = None;
    assert_violation(header.validate());
}

#[test]
fn analog_component_needs_calibration() {
    let mut header = valid_header();
    header.fields[0].components[0].kind = famos_rs::ComponentKind::Analog {
        calibration_info: None,
    };
    assert_violation(header.validate());
}

#[test]
fn value_size_must_match_data_type() {
    let mut header = valid_header();
    header.fields[0].components[0].pack_info.value_size = 2;
    assert_violation(header.validate());
}

#[test]
fn pack_offset_must_fall_inside_the_buffer() {
    let mut header = valid_header();
    header.fields[0].components[0].pack_info.offset = 32;
    assert_violation(header.validate());

    header.fields[0].components[0].pack_info.offset = u64::MAX - 1;
    assert_violation(header.validate());

    header.fields[0].components[0].pack_info.offset = 28;
    header.validate().unwrap();
}

#[test]
fn equidistant_field_has_no_secondary_component() {
    let mut header = valid_header();
    let secondary = Component::analog(DataType::F32, 8, CalibrationInfo::default())
        .with_role(ComponentRole::Secondary);
    header.fields[0].components.push(secondary);
    assert_violation(header.validate());
}

#[test]
fn xy_field_needs_a_secondary_component() {
    let mut header = valid_header();
    header.fields[0].field_type = FieldType::Xy;
    assert_violation(header.validate());
}

#[test]
fn scaling_cannot_be_dropped_by_a_later_component() {
    let mut header = valid_header();
    header.fields[0].components[0].x_scaling = Some(XAxisScaling::new(0.5, "s"));
    let channel = Channel::new("Current");
    header.groups[0].add_channel(&channel);
    let block = header.raw_blocks[0].id;
    header.fields[0]
        .components
        .push(Component::analog(DataType::F32, 8, CalibrationInfo::default()).with_channel(channel));
    header
        .align_buffers(block, BufferAlignment::Continuous)
        .unwrap();
    assert_violation(header.validate());

    header.fields[0].components[1].x_scaling = Some(XAxisScaling::new(0.5, "s"));
    header.validate().unwrap();
}

#[test]
fn display_range_and_color() {
    let mut header = valid_header();
    header.fields[0].components[0].display_info = Some(DisplayInfo::new((0, 0, 0), 5.0, 5.0));
    assert_violation(header.validate());

    header.fields[0].components[0].display_info = Some(DisplayInfo::new((0, 256, 0), 0.0, 5.0));
    assert_violation(header.validate());
}

#[test]
fn trigger_time_fields_are_range_checked() {
    let mut header = valid_header();
    header.fields[0].components[0].trigger_time = Some(TriggerTime::new(2024, 13, 1, 0, 0, 0.0));
    assert_violation(header.validate());

    header.fields[0].components[0].trigger_time = Some(TriggerTime::new(2024, 12, 1, 0, 0, 60.0));
    assert_violation(header.validate());

    header.fields[0].components[0].trigger_time = Some(TriggerTime::new(2024, 12, 1, 23, 59, 59.9));
    header.validate().unwrap();
}

#[test]
fn save_validates_first() {
    let mut header = valid_header();
    header.raw_blocks[0].length = 0;
    let mut sink = VecWriter::new();
    let result = header.save_to(&mut sink, &SaveOptions::default(), |_| Ok(()));
    assert_violation(result);
    assert!(sink.is_empty());
}

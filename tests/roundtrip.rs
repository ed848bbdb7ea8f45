use famos_rs::{
    BufferAlignment, CalibrationInfo, Channel, ChannelValues, Component, ComponentRole,
    CustomKey, DataType, DataWriter, DisplayInfo, Error, Event, EventInfo, EventReference,
    FamosFile, FamosHeader, Field, FieldType, Group, LanguageInfo, Property, PropertyInfo,
    RawBlock, Result, SaveOptions, SingleValue, Text, TriggerTime, VecWriter, XAxisScaling,
};
use std::io::Cursor;

fn save(
    header: &mut FamosHeader,
    data: impl FnOnce(&mut DataWriter<'_, VecWriter>) -> Result<()>,
) -> Result<Vec<u8>> {
    let mut sink = VecWriter::new();
    header.save_to(&mut sink, &SaveOptions::default(), data)?;
    Ok(sink.into_inner())
}

fn reopen(bytes: Vec<u8>) -> Result<FamosFile<Cursor<Vec<u8>>>> {
    FamosFile::from_reader(Cursor::new(bytes))
}

#[test]
fn metadata_survives_save_and_open() -> Result<()> {
    let pressure = Channel::new("Pressure").with_comment("inlet");
    let temperature = Channel::new("Temperature");

    let first = Component::analog(DataType::I16, 5, CalibrationInfo::linear(0.5, -10.0, "bar"))
        .with_x_scaling(XAxisScaling::new(0.001, "s"))
        .with_trigger_time(TriggerTime::new(2024, 3, 14, 15, 9, 26.5))
        .with_display_info(DisplayInfo::new((255, 0, 0), -10.0, 40.0))
        .with_channel(pressure.clone());
    let second = Component::analog(DataType::F64, 5, CalibrationInfo::with_unit("°C"))
        .with_x_scaling(XAxisScaling::new(0.001, "s"))
        .with_trigger_time(TriggerTime::new(2024, 3, 14, 15, 9, 26.5))
        .with_channel(temperature.clone());
    let (first_id, second_id) = (first.id, second.id);

    let mut group = Group::new("Plant").with_comment("hall 2");
    group.add_channel(&pressure);
    group.add_text(Text::with_values("Operators", vec!["Ada".into(), "Linus".into()]));
    group.add_single_value(SingleValue::new("Ambient", 21.5, "°C"));
    group.properties = Some(PropertyInfo {
        properties: vec![Property::new("site", "Chemnitz")],
    });

    let mut header = FamosHeader::new();
    header.language = Some(LanguageInfo::default());
    header.custom_keys.push(CustomKey::new("SerialNo", b"A-17".to_vec()));
    header.groups.push(group);
    header.texts.push(Text::new("Project", "Retrofit"));
    header.add_channel(&temperature);
    header
        .fields
        .push(Field::new(FieldType::EquidistantTime).with_component(first).with_component(second));
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let bytes = save(&mut header, |data| {
        data.write_single(first_id, &[1i16, 2, 3, 4, 5])?;
        data.write_single(second_id, &[20.0f64, 20.5, 21.0, 21.5, 22.0])
    })?;
    assert!(bytes.starts_with(b"|CF,2,1,1;\r\n|CK,1,3,1,1;\r\n"));

    let file = reopen(bytes)?;
    let loaded = file.header();
    assert_eq!(loaded.language.map(|l| l.code_page), Some(1252));
    assert_eq!(loaded.custom_keys[0].key, "SerialNo");
    assert_eq!(loaded.custom_keys[0].value, b"A-17");

    let plant = loaded.group_by_name("Plant").unwrap();
    assert_eq!(plant.comment, "hall 2");
    assert_eq!(plant.texts[0].values, vec!["Ada", "Linus"]);
    assert_eq!(plant.single_values[0].value, 21.5);
    assert_eq!(plant.single_values[0].unit, "°C");
    assert_eq!(
        plant.properties.as_ref().unwrap().properties[0].value,
        "Chemnitz"
    );
    assert_eq!(plant.channels.len(), 1);
    assert_eq!(loaded.texts[0].values, vec!["Retrofit"]);
    assert_eq!(loaded.channels.len(), 1);

    let field = &loaded.fields[0];
    assert_eq!(field.components.len(), 2);
    let component = &field.components[0];
    assert_eq!(component.channels[0].name, "Pressure");
    assert_eq!(component.channels[0].comment, "inlet");
    assert_eq!(component.calibration_info().unwrap().factor, 0.5);
    assert_eq!(component.x_scaling.as_ref().unwrap().dx, 0.001);
    assert_eq!(component.trigger_time.as_ref().unwrap().second, 26.5);
    assert_eq!(component.display_info.as_ref().unwrap().y_max, 40.0);
    assert_eq!(field.components[1].x_scaling, component.x_scaling);
    assert_eq!(field.components[1].calibration_info().unwrap().unit, "°C");
    Ok(())
}

#[test]
fn values_read_back_by_channel() -> Result<()> {
    let channel = Channel::new("Speed");
    let component = Component::analog(DataType::F32, 4, CalibrationInfo::with_unit("rpm"))
        .with_channel(channel.clone());
    let component_id = component.id;

    let mut header = FamosHeader::new();
    header.add_channel(&channel);
    header
        .fields
        .push(Field::new(FieldType::EquidistantTime).with_component(component));
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let bytes = save(&mut header, |data| {
        data.write_single(component_id, &[800.0f32, 810.0, 845.5, 900.0])
    })?;
    let mut file = reopen(bytes)?;
    let id = file.header().channel_by_name("Speed").unwrap().id;

    let all = file.read_single(id, 0, 0)?;
    assert_eq!(all.name, "Speed");
    assert_eq!(
        all.values(),
        Some(&ChannelValues::F32(vec![800.0, 810.0, 845.5, 900.0]))
    );

    let window = file.read_single(id, 1, 2)?;
    assert_eq!(window.values(), Some(&ChannelValues::F32(vec![810.0, 845.5])));

    assert!(matches!(
        file.read_single(id, 3, 2),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn xy_channel_brings_its_x_values() -> Result<()> {
    let y = Channel::new("Torque");
    let primary = Component::analog(DataType::F64, 3, CalibrationInfo::with_unit("Nm"))
        .with_channel(y.clone());
    let secondary = Component::analog(DataType::F64, 3, CalibrationInfo::with_unit("rpm"))
        .with_role(ComponentRole::Secondary);
    let (primary_id, secondary_id) = (primary.id, secondary.id);

    let mut header = FamosHeader::new();
    header.add_channel(&y);
    header.fields.push(
        Field::new(FieldType::Xy)
            .with_component(primary)
            .with_component(secondary),
    );
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Interlaced)?;

    let bytes = save(&mut header, |data| {
        data.write_single(primary_id, &[10.0f64, 12.0, 11.0])?;
        data.write_single(secondary_id, &[1000.0f64, 2000.0, 3000.0])
    })?;
    let mut file = reopen(bytes)?;

    let data = file.read_all()?;
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].field_type, FieldType::Xy);
    assert_eq!(data[0].components.len(), 2);
    assert_eq!(data[0].components[0].role, ComponentRole::Primary);
    assert_eq!(
        data[0].components[0].values,
        ChannelValues::F64(vec![10.0, 12.0, 11.0])
    );
    assert_eq!(data[0].components[1].role, ComponentRole::Secondary);
    assert_eq!(
        data[0].components[1].values,
        ChannelValues::F64(vec![1000.0, 2000.0, 3000.0])
    );
    Ok(())
}

#[test]
fn writing_the_wrong_sample_type_fails() -> Result<()> {
    let channel = Channel::new("Counter");
    let component = Component::analog(DataType::U32, 2, CalibrationInfo::default())
        .with_channel(channel.clone());
    let component_id = component.id;

    let mut header = FamosHeader::new();
    header.add_channel(&channel);
    header
        .fields
        .push(Field::new(FieldType::EquidistantTime).with_component(component));
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let result = save(&mut header, |data| data.write_single(component_id, &[1.0f32, 2.0]));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = save(&mut header, |data| data.write_single(component_id, &[1u32, 2, 3]));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    Ok(())
}

#[test]
fn unwritten_values_read_as_zero() -> Result<()> {
    let channel = Channel::new("Idle");
    let mut header = FamosHeader::new();
    header.add_channel(&channel);
    header.fields.push(
        Field::new(FieldType::EquidistantTime).with_component(
            Component::analog(DataType::U16, 3, CalibrationInfo::default()).with_channel(channel),
        ),
    );
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let bytes = save(&mut header, |_| Ok(()))?;
    let mut file = reopen(bytes)?;
    let data = file.read_all()?;
    assert_eq!(data[0].values(), Some(&ChannelValues::U16(vec![0, 0, 0])));
    Ok(())
}

#[test]
fn unknown_keys_between_known_ones_are_skipped() -> Result<()> {
    let bytes = b"|CF,2,1,1;\r\n|CK,1,3,1,1;\r\n|XY,3,5,a,b;c;\r\n|CB,1,12,1,5,Group,0,;\r\n".to_vec();
    let file = reopen(bytes)?;
    assert_eq!(file.header().groups.len(), 1);
    assert_eq!(file.header().groups[0].name, "Group");
    Ok(())
}

#[test]
fn incomplete_file_is_rejected() {
    let channel = Channel::new("Late");
    let mut header = FamosHeader::new();
    header.add_channel(&channel);
    header.fields.push(
        Field::new(FieldType::EquidistantTime).with_component(
            Component::analog(DataType::U8, 1, CalibrationInfo::default()).with_channel(channel),
        ),
    );
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header
        .align_buffers(block_id, BufferAlignment::Continuous)
        .unwrap();

    let mut bytes = save(&mut header, |_| Ok(())).unwrap();
    // Undo the final patch, as if the writer had died before finishing.
    let flag = b"|CF,2,1,1;\r\n|CK,1,3,1,".len();
    assert_eq!(bytes[flag], b'1');
    bytes[flag] = b'0';
    assert!(matches!(reopen(bytes), Err(Error::UnterminatedKeyGroup)));
}

#[test]
fn truncated_stream_is_rejected() {
    let bytes = b"|CF,2,1,1;\r\n|CK,1,3,1,1;\r\n|CB,1,12,1,5,Gro".to_vec();
    assert!(matches!(
        reopen(bytes),
        Err(Error::TruncatedStream { .. })
    ));
}

#[test]
fn absurd_lengths_and_counts_fail_without_allocating() {
    let huge_buffer_count = b"|CF,2,1,1;|CK,1,3,1,1;|CG,1,5,1,1,1;|CC,1,3,1,1;\
|CP,1,16,1,8,8,64,0,0,1,0;|Cb,1,12,4000000000,0;"
        .to_vec();
    assert!(matches!(
        reopen(huge_buffer_count),
        Err(Error::MalformedKey { .. } | Error::TruncatedStream { .. })
    ));

    let huge_key_length = b"|CF,2,1,1;|CK,1,3,1,1;|CB,1,18446744073709551615,1,1,G,0,;".to_vec();
    assert!(matches!(
        reopen(huge_key_length),
        Err(Error::MalformedKey { .. })
    ));

    let huge_string = b"|CF,2,1,1;|CK,1,3,1,1;|CB,1,30,1,9000000000000,G,0,;".to_vec();
    assert!(matches!(
        reopen(huge_string),
        Err(Error::MalformedKey { .. } | Error::TruncatedStream { .. })
    ));
}

#[test]
fn extreme_reals_survive_save_and_open() -> Result<()> {
    let channel = Channel::new("Field strength");
    let component = Component::analog(
        DataType::F64,
        1,
        CalibrationInfo::linear(f64::MAX, 1e-300, "V/m"),
    )
    .with_x_scaling(XAxisScaling::new(f64::MIN_POSITIVE, "s"))
    .with_channel(channel.clone());
    let component_id = component.id;

    let mut group = Group::new("Lab");
    group.add_channel(&channel);
    group.add_single_value(SingleValue::new("Limit", -1e200, "V/m"));

    let mut header = FamosHeader::new();
    header.groups.push(group);
    header
        .fields
        .push(Field::new(FieldType::EquidistantTime).with_component(component));
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let bytes = save(&mut header, |data| data.write_single(component_id, &[1e-150f64]))?;
    let file = reopen(bytes)?;
    let loaded = file.header();

    let component = &loaded.fields[0].components[0];
    let calibration = component.calibration_info().unwrap();
    assert_eq!(calibration.factor, f64::MAX);
    assert_eq!(calibration.offset, 1e-300);
    assert_eq!(component.x_scaling.as_ref().unwrap().dx, f64::MIN_POSITIVE);
    let lab = loaded.group_by_name("Lab").unwrap();
    assert_eq!(lab.single_values[0].value, -1e200);
    Ok(())
}

#[test]
fn digital_values_are_unsupported() -> Result<()> {
    let line = Channel::new("Valve").with_bit_index(1);
    let mut header = FamosHeader::new();
    header.add_channel(&line);
    header.fields.push(
        Field::new(FieldType::EquidistantTime)
            .with_component(Component::digital(4).with_channel(line)),
    );
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let bytes = save(&mut header, |_| Ok(()))?;
    let mut file = reopen(bytes)?;
    assert!(file.header().fields[0].components[0].is_digital());
    assert!(matches!(
        file.read_all(),
        Err(Error::UnsupportedFeature(_))
    ));
    Ok(())
}

#[test]
fn event_lists_round_trip_as_metadata() -> Result<()> {
    let channel = Channel::new("Shots");
    let info = EventInfo::new(vec![
        Event {
            length: 8,
            time: 0.25,
            dx: 0.001,
            ..Default::default()
        },
        Event {
            offset: 8,
            length: 8,
            time: 1.75,
            dx: 0.001,
            ..Default::default()
        },
    ]);
    let mut component = Component::analog(DataType::I16, 8, CalibrationInfo::default())
        .with_channel(channel.clone());
    component.event_reference = Some(EventReference {
        count: 2,
        ..EventReference::new(info.id)
    });
    let component_id = component.id;

    let mut field = Field::new(FieldType::EquidistantTime).with_component(component);
    field.event_infos.push(info);
    let mut header = FamosHeader::new();
    header.add_channel(&channel);
    header.fields.push(field);
    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;

    let result = save(&mut header, |data| data.write_single(component_id, &[1i16; 8]));
    assert!(matches!(result, Err(Error::UnsupportedFeature(_))));

    let bytes = save(&mut header, |_| Ok(()))?;
    let mut file = reopen(bytes)?;
    let field = &file.header().fields[0];
    assert_eq!(field.event_infos.len(), 1);
    let events = &field.event_infos[0].events;
    assert_eq!(events.len(), 2);
    assert_eq!((events[1].offset, events[1].time), (8, 1.75));
    let reference = field.components[0].event_reference.as_ref().unwrap();
    assert_eq!(reference.event_info, Some(field.event_infos[0].id));
    assert_eq!(reference.count, 2);

    assert!(matches!(
        file.read_all(),
        Err(Error::UnsupportedFeature(_))
    ));
    Ok(())
}

//! A generator test stand: eight temperature channels sampled at 1 Hz, the
//! first four of them grouped.

use famos_rs::{
    BufferAlignment, CalibrationInfo, Channel, ChannelValues, Component, DataType, FamosFile,
    FamosHeader, Field, FieldType, Group, RawBlock, Result, SaveOptions, XAxisScaling,
};

const COMPONENTS: usize = 8;
const SAMPLES: usize = 10;

fn samples(component: usize) -> Vec<f64> {
    (0..SAMPLES)
        .map(|i| 20.0 + component as f64 + i as f64 * 0.25)
        .collect()
}

#[test]
fn generator_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("generator.dat");

    let mut header = FamosHeader::new();
    let mut group = Group::new("Generator");
    let mut field = Field::new(FieldType::EquidistantTime);
    let mut component_ids = Vec::with_capacity(COMPONENTS);

    for i in 0..COMPONENTS {
        let channel = Channel::new(format!("GEN_TEMP_{}", i + 1));
        if i < 4 {
            group.add_channel(&channel);
        } else {
            header.add_channel(&channel);
        }
        let component =
            Component::analog(DataType::F64, SAMPLES as u64, CalibrationInfo::with_unit("°C"))
                .with_x_scaling(XAxisScaling::new(1.0, "s"))
                .with_channel(channel);
        component_ids.push(component.id);
        field = field.with_component(component);
    }
    header.groups.push(group);
    header.fields.push(field);

    let block = RawBlock::new();
    let block_id = block.id;
    header.raw_blocks.push(block);
    header.align_buffers(block_id, BufferAlignment::Continuous)?;
    assert_eq!(header.raw_blocks[0].length, (COMPONENTS * SAMPLES * 8) as u64);

    header.save(&path, &SaveOptions::default(), |data| {
        for (i, id) in component_ids.iter().enumerate() {
            data.write_single(*id, &samples(i))?;
        }
        Ok(())
    })?;

    let mut file = FamosFile::open(&path)?;
    let loaded = file.header();
    assert_eq!(loaded.groups.len(), 1);
    assert_eq!(loaded.groups[0].name, "Generator");
    assert_eq!(loaded.groups[0].channels.len(), 4);
    assert_eq!(loaded.channels.len(), 4);
    assert_eq!(loaded.fields.len(), 1);
    assert_eq!(loaded.fields[0].components.len(), COMPONENTS);
    assert_eq!(
        loaded.fields[0].components[2].channels[0].name,
        "GEN_TEMP_3"
    );

    let channel = loaded.fields[0].components[2].channels[0].id;
    let data = file.read_single(channel, 0, 0)?;
    assert_eq!(data.values(), Some(&ChannelValues::F64(samples(2))));
    assert_eq!(data.values().map(|v| v.len()), Some(SAMPLES));

    let all = file.read_all()?;
    assert_eq!(all.len(), COMPONENTS);
    for (i, data) in all.iter().enumerate() {
        assert_eq!(data.name, format!("GEN_TEMP_{}", i + 1));
        assert_eq!(data.values().and_then(|v| v.as_f64()), Some(&samples(i)[..]));
    }
    Ok(())
}

#[test]
fn existing_file_is_kept_with_create_new() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("keep.dat");
    std::fs::write(&path, b"not a famos file")?;

    let mut header = FamosHeader::new();
    let result = header.save(
        &path,
        &SaveOptions::default().with_mode(famos_rs::SaveMode::CreateNew),
        |_| Ok(()),
    );
    assert!(matches!(result, Err(famos_rs::Error::Io(_))));
    assert_eq!(std::fs::read(&path)?, b"not a famos file");
    Ok(())
}

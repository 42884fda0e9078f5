use std::io::Cursor;

use tiffio::io::{ContentSource, MemoryStore, SeekStream};
use tiffio::reader::TiffFileReader;
use tiffio::tags::{IfdPointer, PhotometricModel, Tag};
use tiffio::writer::{Ifd, TiffFileWriter};
use tiffio::{Rational, SRational, TiffMode, ValueCollection};

fn reopen(writer: TiffFileWriter<MemoryStore>) -> TiffFileReader<MemoryStore> {
    let bytes = writer.into_inner().into_bytes();
    TiffFileReader::open(MemoryStore::from(bytes)).unwrap()
}

#[test]
fn classic_minimal_image() {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);

    let strip = writer
        .write_aligned_values(&[0x00u8, 0x55, 0xAA, 0xFF][..])
        .unwrap();
    assert_eq!(strip.offset, 8);
    assert_eq!(strip.length, 4);

    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::ImageWidth, &2u32).unwrap();
    ifd.add_entry(Tag::ImageLength, &2u32).unwrap();
    ifd.add_entry(Tag::BitsPerSample, &8u16).unwrap();
    ifd.add_entry(Tag::PhotometricInterpretation, &PhotometricModel::BlackIsZero.to_u16())
        .unwrap();
    ifd.add_entry(Tag::SamplesPerPixel, &1u16).unwrap();
    ifd.add_entry(Tag::RowsPerStrip, &2u32).unwrap();
    ifd.add_entry(Tag::StripOffsets, &(strip.offset as u32)).unwrap();
    ifd.add_entry(Tag::StripByteCounts, &(strip.length as u32)).unwrap();
    let ifd_offset = ifd.commit().unwrap();
    assert_eq!(ifd_offset, 12);
    writer.flush_header().unwrap();

    let bytes = writer.into_inner().into_bytes();
    // header: II, 42, then the first-IFD offset right past the strip
    assert_eq!(&bytes[..4], &[0x49, 0x49, 42, 0]);
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 12);

    let mut reader = TiffFileReader::open(MemoryStore::from(bytes)).unwrap();
    assert_eq!(reader.mode(), TiffMode::Classic);

    let mut ifd = reader.first_ifd().unwrap();
    assert_eq!(ifd.offset(), 12);
    assert_eq!(ifd.next_ifd(), None);

    let photometric: ValueCollection<u16> =
        ifd.read_values(Tag::PhotometricInterpretation).unwrap();
    assert_eq!(
        PhotometricModel::from_u16(*photometric.first().unwrap()),
        PhotometricModel::BlackIsZero
    );
    assert_eq!(
        ifd.read_values::<u16>(Tag::BitsPerSample).unwrap(),
        ValueCollection::Single(8)
    );

    let offsets: ValueCollection<u32> = ifd.read_values(Tag::StripOffsets).unwrap();
    let counts: ValueCollection<u32> = ifd.read_values(Tag::StripByteCounts).unwrap();
    let mut strip = vec![0u8; *counts.first().unwrap() as usize];
    let mut store = reader.into_inner();
    store
        .read_exact_at(u64::from(*offsets.first().unwrap()), &mut strip)
        .unwrap();
    assert_eq!(strip, vec![0x00, 0x55, 0xAA, 0xFF]);
}

#[test]
fn every_classic_field_type_round_trips() {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);

    // Leave the cursor odd so alignment actually has something to fix.
    writer.write_bytes(&[0xEE]).unwrap();

    let bytes_v = [1u8, 2, 3, 4, 5];
    let sbytes_v = [-1i8, 2, -3, 4, 5];
    let shorts_v = [1u16, 0xFFFF, 42];
    let sshorts_v = [-5i16, 30000, -30000];
    let longs_v = [70_000u32, 1];
    let slongs_v = [-70_000i32, 2];
    let floats_v = [1.5f32, -2.5];
    let doubles_v = [std::f64::consts::PI];
    let rationals_v = [Rational { n: 1, d: 3 }, Rational { n: 355, d: 113 }];
    let srationals_v = [SRational { n: -1, d: 3 }];
    let strings_v = ["left", "right"];

    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::Unknown(50_001), &bytes_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_002), &sbytes_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_003), &shorts_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_004), &sshorts_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_005), &longs_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_006), &slongs_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_007), &floats_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_008), &doubles_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_009), &rationals_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_010), &srationals_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_011), &strings_v[..]).unwrap();
    ifd.commit().unwrap();
    writer.flush_header().unwrap();

    let mut reader = reopen(writer);
    let mut ifd = reader.first_ifd().unwrap();

    // Tag ids are strictly ascending on disk.
    let tags: Vec<u16> = ifd.entries().iter().map(|e| e.tag).collect();
    let mut sorted = tags.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(tags, sorted);

    // Every out-of-line payload landed on an even offset.
    for entry in ifd.entries().to_vec() {
        let size = entry.payload_size().unwrap();
        if size > 4 {
            let offset =
                entry.payload_offset(TiffMode::Classic, tiffio::io::ByteOrder::LittleEndian);
            assert_eq!(offset % 2, 0, "payload of tag {} is unaligned", entry.tag);
        }
    }

    assert_eq!(
        ifd.read_values::<u8>(Tag::Unknown(50_001)).unwrap().into_vec(),
        bytes_v
    );
    assert_eq!(
        ifd.read_values::<i8>(Tag::Unknown(50_002)).unwrap().into_vec(),
        sbytes_v
    );
    assert_eq!(
        ifd.read_values::<u16>(Tag::Unknown(50_003)).unwrap().into_vec(),
        shorts_v
    );
    assert_eq!(
        ifd.read_values::<i16>(Tag::Unknown(50_004)).unwrap().into_vec(),
        sshorts_v
    );
    assert_eq!(
        ifd.read_values::<u32>(Tag::Unknown(50_005)).unwrap().into_vec(),
        longs_v
    );
    assert_eq!(
        ifd.read_values::<i32>(Tag::Unknown(50_006)).unwrap().into_vec(),
        slongs_v
    );
    assert_eq!(
        ifd.read_values::<f32>(Tag::Unknown(50_007)).unwrap().into_vec(),
        floats_v
    );
    assert_eq!(
        ifd.read_values::<f64>(Tag::Unknown(50_008)).unwrap().into_vec(),
        doubles_v
    );
    assert_eq!(
        ifd.read_values::<Rational>(Tag::Unknown(50_009)).unwrap().into_vec(),
        rationals_v
    );
    assert_eq!(
        ifd.read_values::<SRational>(Tag::Unknown(50_010)).unwrap().into_vec(),
        srationals_v
    );
    assert_eq!(
        ifd.read_values::<String>(Tag::Unknown(50_011)).unwrap().into_vec(),
        vec!["left".to_string(), "right".to_string()]
    );
}

#[test]
fn big_mode_round_trips_wide_types() {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Big);

    let longs8_v = [1u64 << 33, 7];
    let slongs8_v = [-(1i64 << 40)];

    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::Unknown(50_001), &longs8_v[..]).unwrap();
    ifd.add_entry(Tag::Unknown(50_002), &slongs8_v[..]).unwrap();
    // 8-byte inline cap: four shorts still pack inline in big mode
    ifd.add_entry(Tag::Unknown(50_003), &[1u16, 2, 3, 4][..]).unwrap();
    ifd.commit().unwrap();
    writer.flush_header().unwrap();

    let mut reader = reopen(writer);
    assert_eq!(reader.mode(), TiffMode::Big);

    let mut ifd = reader.first_ifd().unwrap();
    assert_eq!(
        ifd.read_values::<u64>(Tag::Unknown(50_001)).unwrap().into_vec(),
        longs8_v
    );
    assert_eq!(
        ifd.read_values::<i64>(Tag::Unknown(50_002)).unwrap().into_vec(),
        slongs8_v
    );
    assert_eq!(
        ifd.read_values::<u16>(Tag::Unknown(50_003)).unwrap().into_vec(),
        [1, 2, 3, 4]
    );
}

#[test]
fn ascii_multi_string_on_disk_layout() {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);

    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::ImageDescription, &["left", "right"][..])
        .unwrap();
    ifd.commit().unwrap();
    writer.flush_header().unwrap();

    let bytes = writer.into_inner().into_bytes();
    // count = 11, payload spilled out of line right past the header
    let expected = [0x6C, 0x65, 0x66, 0x74, 0x00, 0x72, 0x69, 0x67, 0x68, 0x74, 0x00];
    assert_eq!(&bytes[8..19], &expected);

    let mut reader = TiffFileReader::open(MemoryStore::from(bytes)).unwrap();
    let mut ifd = reader.first_ifd().unwrap();
    let entry = *ifd.find(Tag::ImageDescription).unwrap();
    assert_eq!(entry.count, 11);
    assert_eq!(
        ifd.read_values::<String>(Tag::ImageDescription).unwrap(),
        ValueCollection::Many(vec!["left".to_string(), "right".to_string()])
    );
}

#[test]
fn ifd_chain_is_read_in_write_order() {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);

    let mut first = writer.ifd_writer(None);
    first.add_entry(Tag::ImageWidth, &1u32).unwrap();
    let o1 = first.commit().unwrap();

    let mut second = writer.ifd_writer(Some(o1));
    second.add_entry(Tag::ImageWidth, &2u32).unwrap();
    let o2 = second.commit().unwrap();

    let mut third = writer.ifd_writer(Some(o2));
    third.add_entry(Tag::ImageWidth, &3u32).unwrap();
    let o3 = third.commit().unwrap();

    writer.flush_header().unwrap();

    let mut reader = reopen(writer);
    assert_eq!(reader.chain_offsets().unwrap(), vec![o1, o2, o3]);

    for (index, offset) in [o1, o2, o3].into_iter().enumerate() {
        let mut ifd = reader.ifd(offset).unwrap();
        assert_eq!(
            ifd.read_values::<u32>(Tag::ImageWidth).unwrap(),
            ValueCollection::Single(index as u32 + 1)
        );
    }

    let last = reader.ifd(o3).unwrap();
    assert_eq!(last.next_ifd(), None);
}

#[test]
fn sub_ifd_traversal_is_the_callers_choice() {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);

    // The child directory goes first; only the parent is linked from the
    // header.
    let mut child = writer.ifd_writer(None);
    child.add_entry(Tag::ImageWidth, &64u32).unwrap();
    let child_offset = child.commit().unwrap();

    let mut parent = writer.ifd_writer(None);
    parent.add_entry(Tag::ImageWidth, &1024u32).unwrap();
    parent
        .add_entry(Tag::SubIfd, &Ifd(child_offset as u32))
        .unwrap();
    let parent_offset = parent.commit().unwrap();
    writer.flush_header().unwrap();

    let mut reader = reopen(writer);
    assert_eq!(reader.first_ifd_offset(), parent_offset);

    let pointer = {
        let mut parent = reader.first_ifd().unwrap();
        *parent
            .read_values::<IfdPointer>(Tag::SubIfd)
            .unwrap()
            .first()
            .unwrap()
    };
    assert_eq!(pointer, IfdPointer(child_offset));

    let mut child = reader.ifd(pointer.0).unwrap();
    assert_eq!(
        child.read_values::<u32>(Tag::ImageWidth).unwrap(),
        ValueCollection::Single(64)
    );
}

#[test]
fn seek_stream_backed_file_round_trips() {
    let mut writer = TiffFileWriter::new(
        SeekStream::new(Cursor::new(Vec::new())),
        TiffMode::Classic,
    );
    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::ImageWidth, &3u32).unwrap();
    ifd.add_entry(Tag::Software, &"tiffio").unwrap();
    ifd.commit().unwrap();
    writer.flush_header().unwrap();

    let bytes = writer.into_inner().into_inner().into_inner();
    let mut reader =
        TiffFileReader::open(SeekStream::new(Cursor::new(bytes))).unwrap();
    let mut ifd = reader.first_ifd().unwrap();
    assert_eq!(
        ifd.read_values::<u32>(Tag::ImageWidth).unwrap(),
        ValueCollection::Single(3)
    );
    assert_eq!(
        ifd.read_values::<String>(Tag::Software).unwrap(),
        ValueCollection::Single("tiffio".to_string())
    );
}

#[test]
fn big_endian_files_round_trip() {
    let mut writer = TiffFileWriter::with_byte_order(
        MemoryStore::new(),
        TiffMode::Classic,
        tiffio::io::ByteOrder::BigEndian,
    );

    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::ImageWidth, &0x0102_0304u32).unwrap();
    ifd.add_entry(Tag::Unknown(50_000), &[0x1122u16, 0x3344, 0x5566][..])
        .unwrap();
    ifd.commit().unwrap();
    writer.flush_header().unwrap();

    let bytes = writer.into_inner().into_bytes();
    assert_eq!(&bytes[..4], &[0x4D, 0x4D, 0, 42]);

    let mut reader = TiffFileReader::open(MemoryStore::from(bytes)).unwrap();
    assert_eq!(reader.byte_order(), tiffio::io::ByteOrder::BigEndian);
    let mut ifd = reader.first_ifd().unwrap();
    assert_eq!(
        ifd.read_values::<u32>(Tag::ImageWidth).unwrap(),
        ValueCollection::Single(0x0102_0304)
    );
    assert_eq!(
        ifd.read_values::<u16>(Tag::Unknown(50_000)).unwrap().into_vec(),
        [0x1122, 0x3344, 0x5566]
    );
}

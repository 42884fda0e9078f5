use futures::executor::block_on;

use tiffio::io::{BlockingAdapter, CancellationToken, MemoryStore, SyncOverAsync};
use tiffio::reader::TiffFileReader;
use tiffio::reader_async::AsyncTiffFileReader;
use tiffio::tags::Tag;
use tiffio::writer::TiffFileWriter;
use tiffio::{TiffError, TiffMode, UnsupportedError, ValueCollection};

fn sample_file() -> Vec<u8> {
    let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);
    let mut ifd = writer.ifd_writer(None);
    ifd.add_entry(Tag::ImageWidth, &640u32).unwrap();
    ifd.add_entry(Tag::ImageDescription, &["left", "right"][..])
        .unwrap();
    ifd.add_entry(Tag::Unknown(50_000), &[1u16, 2, 3, 4, 5][..])
        .unwrap();
    ifd.commit().unwrap();
    writer.flush_header().unwrap();
    writer.into_inner().into_bytes()
}

#[test]
fn async_reader_matches_sync_reader() {
    let bytes = sample_file();
    let token = CancellationToken::new();

    block_on(async {
        let source = BlockingAdapter::new(MemoryStore::from(bytes.clone()));
        let mut reader = AsyncTiffFileReader::open(source, &token).await.unwrap();
        assert_eq!(reader.mode(), TiffMode::Classic);
        assert_eq!(reader.chain_offsets(&token).await.unwrap().len(), 1);

        let mut ifd = reader.first_ifd(&token).await.unwrap();
        assert_eq!(
            ifd.read_values::<u32>(Tag::ImageWidth, &token).await.unwrap(),
            ValueCollection::Single(640)
        );
        assert_eq!(
            ifd.read_values::<String>(Tag::ImageDescription, &token)
                .await
                .unwrap()
                .into_vec(),
            vec!["left".to_string(), "right".to_string()]
        );
        assert_eq!(
            ifd.read_values::<u16>(Tag::Unknown(50_000), &token)
                .await
                .unwrap()
                .into_vec(),
            vec![1, 2, 3, 4, 5]
        );
        reader.close().await.unwrap();
    });

    // The same answers through the sync path.
    let mut reader = TiffFileReader::open(MemoryStore::from(bytes)).unwrap();
    let mut ifd = reader.first_ifd().unwrap();
    assert_eq!(
        ifd.read_values::<u32>(Tag::ImageWidth).unwrap(),
        ValueCollection::Single(640)
    );
}

#[test]
fn cancellation_hits_the_next_suspension_point() {
    let bytes = sample_file();
    let token = CancellationToken::new();
    token.cancel();

    block_on(async {
        let source = BlockingAdapter::new(MemoryStore::from(bytes));
        let result = AsyncTiffFileReader::open(source, &token).await;
        assert!(matches!(result, Err(TiffError::Cancelled)));
    });
}

#[test]
fn cancellation_between_operations() {
    let bytes = sample_file();
    let token = CancellationToken::new();

    block_on(async {
        let source = BlockingAdapter::new(MemoryStore::from(bytes));
        let mut reader = AsyncTiffFileReader::open(source, &token).await.unwrap();
        token.cancel();
        assert!(matches!(
            reader.first_ifd(&token).await,
            Err(TiffError::Cancelled)
        ));
    });
}

#[test]
fn sync_over_async_store_is_unsupported() {
    let bytes = sample_file();
    let async_only = SyncOverAsync::new(BlockingAdapter::new(MemoryStore::from(bytes)));
    assert!(matches!(
        TiffFileReader::open(async_only),
        Err(TiffError::Unsupported(
            UnsupportedError::SyncAccessToAsyncStore
        ))
    ));
}

//! Property tests: chunk bounds and index shape for arbitrary record sizes.

use proptest::prelude::*;
use strata_compressing::{
    CompressingStoreFormat, CompressingStoreReader, CompressingStoreWriter, CompressionMode,
};
use strata_storage::io::{IndexInput, VecOutput};

fn build(format: CompressingStoreFormat, sizes: &[usize]) -> (Vec<Vec<u8>>, CompressingStoreReader) {
    let records: Vec<Vec<u8>> = sizes
        .iter()
        .enumerate()
        .map(|(doc, &size)| (0..size).map(|i| (doc + i * 7) as u8).collect())
        .collect();
    let mut writer = CompressingStoreWriter::new(format, VecOutput::new(), VecOutput::new()).unwrap();
    for (doc, record) in records.iter().enumerate() {
        writer.add_document(doc as u32, record).unwrap();
    }
    let finished = writer.finish().unwrap();
    let reader = CompressingStoreReader::open(
        IndexInput::from_vec("data", finished.data.into_inner()),
        IndexInput::from_vec("index", finished.index.into_inner()),
    )
    .unwrap();
    (records, reader)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn chunks_respect_bounds(
        sizes in prop::collection::vec(0usize..120, 0..150),
        chunk_size in 1u32..300,
        max_docs in 1u32..12,
        block_size in 1u32..6,
    ) {
        let format = CompressingStoreFormat::new("Props", CompressionMode::Uncompressed, chunk_size, max_docs, block_size).unwrap();
        let (records, reader) = build(format, &sizes);
        prop_assert_eq!(reader.num_docs() as usize, records.len());

        let entries: Vec<_> = reader.chunk_entries().copied().collect();
        let mut next_doc = 0u32;
        let mut last_offset = None;
        for entry in &entries {
            prop_assert_eq!(entry.start_doc, next_doc);
            prop_assert!(entry.doc_count >= 1);
            prop_assert!(entry.doc_count <= max_docs);
            if let Some(prev) = last_offset {
                prop_assert!(entry.chunk_offset > prev);
            }
            last_offset = Some(entry.chunk_offset);

            let docs = entry.start_doc as usize..entry.end_doc() as usize;
            let without_last: usize = sizes[docs.start..docs.end - 1].iter().sum();
            prop_assert!((without_last as u64) < u64::from(chunk_size));
            if entry.doc_count > 1 {
                // an oversized record never shares a chunk
                prop_assert!(sizes[docs].iter().all(|&s| (s as u64) < u64::from(chunk_size)));
            }
            next_doc = entry.end_doc();
        }
        prop_assert_eq!(next_doc as usize, records.len());
        prop_assert!(reader.num_dirty_chunks() <= 1);

        for (doc, record) in records.iter().enumerate() {
            prop_assert_eq!(&reader.document(doc as u32).unwrap(), record);
        }
    }

    #[test]
    fn compressed_modes_read_back(
        sizes in prop::collection::vec(0usize..2000, 1..40),
        chunk_size in 512u32..8192,
    ) {
        for mode in [CompressionMode::BestSpeed, CompressionMode::BestCompression] {
            let format = CompressingStoreFormat::stored_fields(mode)
                .with_chunk_size(chunk_size)
                .with_max_docs_per_chunk(8);
            let (records, reader) = build(format, &sizes);
            for (doc, record) in records.iter().enumerate() {
                prop_assert_eq!(&reader.document(doc as u32).unwrap(), record);
            }
        }
    }
}

//! Chunked store conformance tests
//!
//! End-to-end behaviour of the document store through the public facade:
//! chunk boundaries, index shape, compression modes, field subsets and
//! file-backed round trips.

use std::sync::Once;

use rand::{rngs::StdRng, Rng, SeedableRng};
use stratastore::{
    CompressingStoreFormat, CompressingStoreReader, CompressingStoreWriter, CompressionMode, Error,
    FieldMask, IndexInput, StoredDocument, VecOutput,
};
use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn write_store(format: CompressingStoreFormat, records: &[Vec<u8>]) -> CompressingStoreReader {
    init_tracing();
    let mut writer = CompressingStoreWriter::new(format, VecOutput::new(), VecOutput::new()).unwrap();
    for (doc, record) in records.iter().enumerate() {
        writer.add_document(doc as u32, record).unwrap();
    }
    let finished = writer.finish().unwrap();
    CompressingStoreReader::open(
        IndexInput::from_vec("data", finished.data.into_inner()),
        IndexInput::from_vec("index", finished.index.into_inner()),
    )
    .unwrap()
}

fn random_records(seed: u64, count: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(0..=max_len);
            // low-entropy payload so the compressing modes have work to do
            (0..len).map(|_| b"abcdefgh"[rng.gen_range(0..8)]).collect()
        })
        .collect()
}

// ============================================================================
// Chunk boundaries
// ============================================================================

#[test]
fn test_chunk_boundaries_10_20_5() {
    let records = vec![vec![1u8; 10], vec![2u8; 20], vec![3u8; 5]];
    let format = CompressingStoreFormat::stored_fields(CompressionMode::BestSpeed)
        .with_chunk_size(25)
        .with_max_docs_per_chunk(10);
    let reader = write_store(format, &records);

    let chunks: Vec<(u32, u32)> = reader
        .chunk_entries()
        .map(|e| (e.start_doc, e.doc_count))
        .collect();
    assert_eq!(chunks, vec![(0, 2), (2, 1)]);
    assert_eq!(reader.num_dirty_chunks(), 1);

    for (doc, record) in records.iter().enumerate() {
        assert_eq!(&reader.document(doc as u32).unwrap(), record);
    }
}

#[test]
fn test_chunk_bound_holds_for_random_sizes() {
    let chunk_size = 1000u32;
    let max_docs = 16u32;
    let records = random_records(0x5EED, 2000, 700);
    let format = CompressingStoreFormat::stored_fields(CompressionMode::BestSpeed)
        .with_chunk_size(chunk_size)
        .with_max_docs_per_chunk(max_docs)
        .with_block_size(8);
    let reader = write_store(format, &records);

    for entry in reader.chunk_entries() {
        assert!(entry.doc_count <= max_docs);
        let first = entry.start_doc as usize;
        let last = entry.end_doc() as usize - 1;
        let without_last: usize = records[first..last].iter().map(Vec::len).sum();
        assert!(without_last < chunk_size as usize, "chunk at doc {} too large", first);
    }
    for doc in (0..records.len()).step_by(37) {
        assert_eq!(reader.document(doc as u32).unwrap(), records[doc]);
    }
}

#[test]
fn test_oversized_records_stand_alone() {
    let mut records = random_records(7, 50, 40);
    records[10] = vec![9u8; 5000];
    records[11] = vec![8u8; 5000];
    let format = CompressingStoreFormat::new("Oversized", CompressionMode::BestSpeed, 256, 64, 4).unwrap();
    let reader = write_store(format, &records);

    let holding = |doc: u32| {
        reader
            .chunk_entries()
            .find(|e| e.start_doc <= doc && doc < e.end_doc())
            .copied()
            .unwrap()
    };
    for doc in [10u32, 11] {
        let entry = holding(doc);
        assert_eq!((entry.start_doc, entry.doc_count), (doc, 1));
        assert_eq!(reader.document(doc).unwrap(), records[doc as usize]);
    }
}

// ============================================================================
// Index shape
// ============================================================================

#[test]
fn test_index_is_monotonic() {
    let records = random_records(42, 3000, 100);
    let format = CompressingStoreFormat::stored_fields(CompressionMode::BestCompression)
        .with_chunk_size(512)
        .with_max_docs_per_chunk(32)
        .with_block_size(5);
    let reader = write_store(format, &records);

    let entries: Vec<_> = reader.chunk_entries().copied().collect();
    assert_eq!(entries.len() as u32, reader.num_chunks());
    assert_eq!(entries[0].start_doc, 0);
    for pair in entries.windows(2) {
        assert_eq!(pair[1].start_doc, pair[0].end_doc());
        assert!(pair[1].chunk_offset > pair[0].chunk_offset);
    }
    assert_eq!(entries.last().unwrap().end_doc(), reader.num_docs());
    reader.check_integrity().unwrap();
}

#[test]
fn test_out_of_range_doc() {
    let reader = write_store(CompressingStoreFormat::default(), &random_records(1, 5, 10));
    assert!(matches!(
        reader.document(5),
        Err(Error::DocOutOfRange { doc_id: 5, max_doc: 5 })
    ));
}

// ============================================================================
// Compression modes
// ============================================================================

#[test]
fn test_mixed_compression_modes_side_by_side() {
    let records = random_records(99, 500, 300);
    let readers: Vec<_> = CompressionMode::ALL
        .into_iter()
        .map(|mode| {
            let format = CompressingStoreFormat::stored_fields(mode).with_chunk_size(2048);
            (mode, write_store(format, &records))
        })
        .collect();

    for (mode, reader) in &readers {
        assert_eq!(reader.codec_id(), mode.codec_id());
        for doc in 0..records.len() as u32 {
            assert_eq!(reader.document(doc).unwrap(), records[doc as usize], "{} doc {}", mode, doc);
        }
    }
}

#[test]
fn test_term_vectors_preset() {
    let format = CompressingStoreFormat::term_vectors();
    assert_eq!(
        format.to_string(),
        "TermVectors(compressionMode=BEST_SPEED, chunkSize=4096, maxDocsPerChunk=128, blockSize=1024)"
    );
    let records = random_records(3, 1000, 64);
    let reader = write_store(format, &records);
    assert_eq!(reader.format_name(), "TermVectors");
    for entry in reader.chunk_entries() {
        assert!(entry.doc_count <= 128);
    }
}

// ============================================================================
// Stored documents
// ============================================================================

#[test]
fn test_field_subsets() {
    init_tracing();
    let docs: Vec<StoredDocument> = (0..20)
        .map(|i| {
            StoredDocument::new()
                .with_field("id", format!("doc-{}", i))
                .with_field("body", "lorem ipsum ".repeat(i * 50))
                .with_field("tag", if i % 2 == 0 { "even" } else { "odd" })
        })
        .collect();

    let mut writer = CompressingStoreWriter::new(
        CompressingStoreFormat::stored_fields(CompressionMode::BestCompression),
        VecOutput::new(),
        VecOutput::new(),
    )
    .unwrap();
    for (doc, stored) in docs.iter().enumerate() {
        writer.add_stored_document(doc as u32, stored).unwrap();
    }
    let finished = writer.finish().unwrap();
    let reader = CompressingStoreReader::open(
        IndexInput::from_vec("data", finished.data.into_inner()),
        IndexInput::from_vec("index", finished.index.into_inner()),
    )
    .unwrap();

    let mask: FieldMask = ["id", "tag"].into_iter().collect();
    for (doc, expected) in docs.iter().enumerate() {
        let full = reader.stored_document(doc as u32).unwrap();
        assert_eq!(&full, expected);

        let subset = reader.document_fields(doc as u32, &mask).unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get("id"), expected.get("id"));
        assert_eq!(subset.get("tag"), expected.get("tag"));
        assert!(subset.get("body").is_none());
    }
}

// ============================================================================
// File-backed stores
// ============================================================================

#[test]
fn test_file_round_trip() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("seg.fdt");
    let index_path = dir.path().join("seg.fdx");
    let records = random_records(2024, 400, 900);

    let format = CompressingStoreFormat::stored_fields(CompressionMode::BestSpeed).with_chunk_size(4096);
    let mut writer = CompressingStoreWriter::create(format, &data_path, &index_path).unwrap();
    for (doc, record) in records.iter().enumerate() {
        writer.add_document(doc as u32, record).unwrap();
    }
    let finished = writer.finish().unwrap();
    let stats = finished.stats;
    finished.data.finish().unwrap();
    finished.index.finish().unwrap();

    let reader = CompressingStoreReader::open_files(&data_path, &index_path).unwrap();
    assert_eq!(reader.num_docs(), stats.num_docs);
    assert_eq!(reader.num_chunks(), stats.num_chunks);
    assert_eq!(std::fs::metadata(&data_path).unwrap().len(), stats.data_length);
    for (doc, record) in records.iter().enumerate() {
        assert_eq!(&reader.document(doc as u32).unwrap(), record);
    }
}

#[test]
fn test_create_refuses_existing_files() {
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("seg.fdt");
    let index_path = dir.path().join("seg.fdx");
    std::fs::write(&data_path, b"taken").unwrap();
    let result = CompressingStoreWriter::create(CompressingStoreFormat::default(), &data_path, &index_path);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_corrupted_file_detected() {
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("seg.fdt");
    let index_path = dir.path().join("seg.fdx");
    let records = random_records(5, 100, 200);

    let format = CompressingStoreFormat::stored_fields(CompressionMode::Uncompressed).with_chunk_size(1024);
    let mut writer = CompressingStoreWriter::create(format, &data_path, &index_path).unwrap();
    for (doc, record) in records.iter().enumerate() {
        writer.add_document(doc as u32, record).unwrap();
    }
    let finished = writer.finish().unwrap();
    finished.data.finish().unwrap();
    finished.index.finish().unwrap();

    let mut bytes = std::fs::read(&data_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&data_path, &bytes).unwrap();

    let reader = CompressingStoreReader::open_files(&data_path, &index_path).unwrap();
    let err = reader.check_integrity().unwrap_err();
    assert!(err.is_corruption());
}

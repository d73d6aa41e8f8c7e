use std::io::Cursor;

use tempfile::tempdir;
use vlqmap::io::{self as map_io, MissingSources, ReadOptions};
use vlqmap::mappings::{self, VlqError, vlq};
use vlqmap::ops::{self, LinePlacement, MergeOptions};
use vlqmap::stream::{StreamHeader, StreamWriter};
use vlqmap::{Mappings, NameMode, Segment, SourceMap, WriteOptions};

const F1: &str = "alert('f1-1');\nalert('f1-2');\nalert('f1-3');\n;\nalert('f1-4');\n\n";
const F2: &str = "alert('f2-1');\nalert('f2-2');\n";
const MERGED: &str = "AAAA;AACA;AACA;AACA;AACA;AACA;AACA;ACNA;AACA;AACA";

fn merged_app() -> SourceMap {
    let f1 = ops::generate_str("f1.js", F1);
    let f2 = ops::generate_str("f2.js", F2);
    ops::merge("public/javascripts/app.js", [&f1, &f2], MergeOptions::default())
}

#[test]
fn generate_then_merge_matches_known_mappings() {
    let map = merged_app();
    assert_eq!(map.table.sources, vec!["f1.js", "f2.js"]);
    assert_eq!(map.table.sources_content, vec![F1, F2]);
    assert_eq!(map.mappings.line_count(), 10);
    assert_eq!(map.mappings_string(), MERGED);
    map.validate().unwrap();
}

#[test]
fn known_mappings_decode_to_expected_model() {
    let model = mappings::decode(MERGED, NameMode::Untracked);
    let expected: Mappings = (0..7)
        .map(|l| vec![Segment::new(0, 0, l, 0)])
        .chain((0..3).map(|l| vec![Segment::new(0, 1, l, 0)]))
        .collect();
    assert_eq!(model, expected);
    assert_eq!(mappings::encode(&model, NameMode::Untracked), MERGED);
}

#[test]
fn written_map_reads_back_identically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.js.map");
    let map = merged_app();

    let stats = map_io::write_file(&path, &map, WriteOptions::default()).unwrap();
    assert_eq!(stats.lines, 10);
    assert_eq!(stats.segments, 10);
    assert_eq!(stats.bytes, std::fs::metadata(&path).unwrap().len());

    let parsed = map_io::read_file(&path, ReadOptions::default()).unwrap();
    assert!(parsed.missing_content.is_empty());
    assert!(!parsed.decode.is_degraded());
    assert_eq!(parsed.map, map);
}

#[test]
fn pretty_output_parses_to_same_map() {
    let map = merged_app();
    let pretty = map.to_json(WriteOptions { pretty: true }).unwrap();
    assert!(pretty.contains(&b'\n'));
    assert_eq!(SourceMap::from_json(&pretty).unwrap().map, map);
}

#[test]
fn missing_content_is_loaded_from_disk() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/f1.js"), F1).unwrap();
    let path = dir.path().join("app.js.map");
    std::fs::write(
        &path,
        r#"{"version":3,"sourceRoot":"src/","sources":["f1.js"],"mappings":"AAAA;AACA"}"#,
    )
    .unwrap();

    let parsed = map_io::read_file(&path, ReadOptions::default()).unwrap();
    assert_eq!(parsed.map.table.sources_content, vec![F1]);
    assert!(parsed.missing_content.is_empty());
}

#[test]
fn unreadable_source_follows_policy() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.js.map");
    std::fs::write(
        &path,
        r#"{"version":3,"sources":["gone.js"],"sourcesContent":[null],"mappings":"AAAA"}"#,
    )
    .unwrap();

    let err = map_io::read_file(&path, ReadOptions::default()).unwrap_err();
    assert!(matches!(err, map_io::IoError::SourceNotFound { .. }));

    let lenient = ReadOptions {
        missing_sources: MissingSources::Empty,
    };
    let parsed = map_io::read_file(&path, lenient).unwrap();
    assert_eq!(parsed.map.table.sources_content, vec![""]);
    assert_eq!(parsed.missing_content, vec![0]);
}

#[test]
fn streamed_generate_matches_in_memory_generate() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("f1.js");
    let output = dir.path().join("f1.js.map");
    std::fs::write(&input, F1).unwrap();

    let stats = map_io::stream_generate_file(&input, &output, None).unwrap();
    assert_eq!(stats.lines, 7);
    assert_eq!(stats.bytes, std::fs::metadata(&output).unwrap().len());

    let streamed = map_io::read_file(&output, ReadOptions::default()).unwrap().map;
    assert_eq!(streamed, map_io::generate_file(&input, None).unwrap());
    assert_eq!(streamed, ops::generate_str("f1.js", F1));
}

#[cfg(feature = "file-io")]
#[test]
fn streamed_generate_reports_output_digest() {
    use sha2::{Digest, Sha256};

    let dir = tempdir().unwrap();
    let input = dir.path().join("f2.js");
    let output = dir.path().join("f2.js.map");
    std::fs::write(&input, F2).unwrap();

    let stats = map_io::stream_generate_file(&input, &output, Some("bundle.js")).unwrap();
    let expected: [u8; 32] = Sha256::digest(std::fs::read(&output).unwrap()).into();
    assert_eq!(stats.sha256, Some(expected));
}

#[test]
fn stream_writer_matches_envelope_serialization() {
    let map = merged_app();
    let header = StreamHeader::new(
        "public/javascripts/app.js",
        vec!["f1.js".into(), "f2.js".into()],
    );
    let mut w = StreamWriter::new(Vec::new(), &header).unwrap();
    for content in [F1, F2] {
        w.next_source().unwrap();
        w.write_source_text(Cursor::new(content)).unwrap();
    }
    for line in map.mappings.lines() {
        w.write_generated_line(line).unwrap();
    }
    let out = w.finish().unwrap();

    let parsed = SourceMap::from_json(&out).unwrap();
    assert_eq!(parsed.map, map);
    assert_eq!(out, map.to_json(WriteOptions::default()).unwrap());
}

#[test]
fn overlay_merge_interleaves_columns() {
    let mut a = SourceMap::new("a.js");
    a.table.push_source("a.ts", "");
    a.mappings = Mappings::from_lines(vec![vec![Segment::new(4, 0, 0, 0)]]);
    let mut b = SourceMap::new("b.js");
    b.table.push_source("b.ts", "");
    b.mappings = Mappings::from_lines(vec![vec![Segment::new(0, 0, 3, 1)], vec![]]);

    let merged = ops::merge(
        "ab.js",
        [&a, &b],
        MergeOptions {
            placement: LinePlacement::Overlay,
        },
    );
    assert_eq!(merged.mappings.line_count(), 2);
    assert_eq!(
        merged.mappings.line(0).unwrap(),
        &[Segment::new(0, 1, 3, 1), Segment::new(4, 0, 0, 0)]
    );
    let reparsed = SourceMap::from_json(&merged.to_json(WriteOptions::default()).unwrap()).unwrap();
    assert_eq!(reparsed.map, merged);
}

#[test]
fn degraded_mappings_still_parse() {
    let json = br#"{"version":3,"sources":["a.js"],"sourcesContent":[""],"mappings":"AAAA;AA!A;AACA"}"#;
    let parsed = SourceMap::from_json(json).unwrap();
    assert!(parsed.decode.is_degraded());
    assert_eq!(parsed.map.mappings.line_count(), 3);
    // The bad line delta keeps the previous source line.
    assert_eq!(parsed.map.mappings.line(1).unwrap()[0].source_line, 0);
    assert_eq!(parsed.map.mappings.line(2).unwrap()[0].source_line, 1);
}

#[test]
fn vlq_errors_are_reported() {
    assert_eq!(vlq::read_i64(b""), Err(VlqError::Empty));
    assert_eq!(vlq::read_i64(b"g"), Err(VlqError::Truncated));
    assert_eq!(vlq::read_i64(b"A*"), Ok((0, 1)));
    assert!(matches!(
        vlq::read_i64(b"*"),
        Err(VlqError::InvalidSymbol { symbol: b'*', offset: 0 })
    ));
}

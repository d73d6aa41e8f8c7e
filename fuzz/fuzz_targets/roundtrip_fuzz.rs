#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use vlqmap::stream::{StreamHeader, StreamWriter};
use vlqmap::{Segment, SourceMap};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte: sources count; remainder split into source text and
    // segment fields.
    let sources = u32::from(data[0] % 4) + 1;
    let payload = &data[1..];
    let split = payload.len() / 2;
    let (text, fields) = payload.split_at(split);
    let text = String::from_utf8_lossy(text);

    let mut lines: Vec<Vec<Segment>> = vec![Vec::new()];
    for chunk in fields.chunks(4) {
        if chunk[0] & 0x80 != 0 {
            lines.push(Vec::new());
        }
        let get = |i: usize| u32::from(chunk.get(i).copied().unwrap_or(0));
        let seg = Segment::new(get(1) * 3, get(0) % sources, get(2), get(3));
        if let Some(line) = lines.last_mut() {
            line.push(seg);
        }
    }

    let names: Vec<String> = (0..sources).map(|i| format!("s{i}.js")).collect();
    let header = StreamHeader::new("out.js", names);
    let mut w = StreamWriter::new(Vec::new(), &header).unwrap();
    for _ in 0..sources {
        w.next_source().unwrap();
        w.write_source_text(Cursor::new(text.as_bytes())).unwrap();
    }
    for line in &lines {
        w.write_generated_line(line).unwrap();
    }
    let out = w.finish().unwrap();

    let parsed = SourceMap::from_json(&out).unwrap();
    parsed.map.validate().unwrap();
    assert_eq!(parsed.map.mappings.into_lines(), lines);
    assert_eq!(parsed.map.table.sources_content[0], text);
});

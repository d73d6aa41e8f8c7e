#![no_main]
use libfuzzer_sys::fuzz_target;
use vlqmap::{SourceMap, WriteOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(parsed) = SourceMap::from_json(data) else {
        return;
    };
    let _ = parsed.map.validate();

    let json = parsed.map.to_json(WriteOptions::default()).unwrap();
    let reparsed = SourceMap::from_json(&json).unwrap();
    assert_eq!(reparsed.map, parsed.map);
});

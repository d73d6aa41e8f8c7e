#![no_main]
use libfuzzer_sys::fuzz_target;
use vlqmap::NameMode;
use vlqmap::mappings;

fuzz_target!(|data: &[u8]| {
    // Decoding never fails; broken fields keep their baseline.
    let text = String::from_utf8_lossy(data);
    for mode in [NameMode::Untracked, NameMode::Tracked] {
        let (m, stats) = mappings::decode_with_stats(&text, mode);
        assert_eq!(m.line_count(), text.split(';').count());
        assert_eq!(stats.segments, m.segment_count());

        // Whatever was recovered re-encodes to text that decodes cleanly.
        let recoded = mappings::encode(&m, mode);
        let (again, stats) = mappings::decode_with_stats(&recoded, mode);
        assert!(!stats.is_degraded());
        assert_eq!(again, m);
    }
});

use std::fs;

use bytepatch::apply::{apply_patch, ApplyOptions};
use bytepatch::binary_diff::ByteDiff;
use bytepatch::create::create_patch;
use proptest::prelude::*;

/// Equal-length original/modified pair with a sparse set of changed bytes.
fn file_pair() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    proptest::collection::vec(any::<u8>(), 1..2048).prop_flat_map(|original| {
        let len = original.len();
        let edits = proptest::collection::vec((0..len, any::<u8>()), 0..64);
        (Just(original), edits).prop_map(|(original, edits)| {
            let mut modified = original.clone();
            for (i, b) in edits {
                modified[i] = b;
            }
            (original, modified)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_apply_reproduces_modified((original, modified) in file_pair()) {
        let dir = tempfile::tempdir().unwrap();
        let o = dir.path().join("o.bin");
        let m = dir.path().join("m.bin");
        let t = dir.path().join("t.bin");
        let p = dir.path().join("p.patch");
        fs::write(&o, &original).unwrap();
        fs::write(&m, &modified).unwrap();
        fs::write(&t, &original).unwrap();

        let summary = create_patch(&o, &m, &p).unwrap();
        if original == modified {
            prop_assert!(!summary.patch_written);
            prop_assert!(!p.exists());
        } else {
            let applied = apply_patch(&t, &p, ApplyOptions::default()).unwrap();
            prop_assert_eq!(applied.bytes_applied, summary.bytes_changed);
            prop_assert_eq!(fs::read(&t).unwrap(), modified);
        }
    }

    #[test]
    fn prop_records_cover_exactly_the_differences((original, modified) in file_pair()) {
        let records: Vec<_> = ByteDiff::from_readers(&original[..], "o", &modified[..], "m")
            .map(|r| r.unwrap())
            .collect();

        let expected: Vec<u64> = (0..original.len())
            .filter(|&i| original[i] != modified[i])
            .map(|i| i as u64)
            .collect();
        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        prop_assert_eq!(offsets, expected);
        for r in &records {
            prop_assert_eq!(r.original, original[r.offset as usize]);
            prop_assert_eq!(r.modified, modified[r.offset as usize]);
        }
    }

    #[test]
    fn prop_identical_input_yields_no_records(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let count = ByteDiff::from_readers(&data[..], "a", &data[..], "b").count();
        prop_assert_eq!(count, 0);
    }
}

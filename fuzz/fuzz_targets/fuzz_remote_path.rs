// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for remote path normalization and listing classification

#![no_main]

use dsync_core::{classify_entry, ListingEntry, RemotePath};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let path = RemotePath::new(input);

        // Normalized paths never escape the base directory
        assert!(path.segments.iter().all(|s| s != ".." && s != "." && !s.is_empty()));
        assert!(path.to_local(Path::new("/base")).starts_with("/base"));
        assert_eq!(RemotePath::new(path.to_path_string()), path);

        let _ = path.parent();
        let _ = path.extension();
        if let Some((dir, name)) = input.split_once('\n') {
            let _ = RemotePath::new(dir).join(name);
        }

        let _ = classify_entry(&ListingEntry::raw(input));
    }
});

// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for path normalization

#![no_main]

use fw_core::path::normalize;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let Ok(path) = normalize(input) else {
            return;
        };

        // Normalizing a normalized path is a no-op
        let text = path.to_string();
        assert!(text.starts_with('/'));
        assert!(!text.contains('\\'));
        assert_eq!(normalize(&text).ok().as_ref(), Some(&path));

        let _ = path.name();
        let _ = path.extension();
        let _ = path.stem();
        if let Some(parent) = path.parent() {
            assert!(path.starts_with(&parent));
        }

        if let Some(name) = input.get(..10) {
            if let Ok(child) = path.join(name) {
                assert_eq!(child.parent().as_ref(), Some(&path));
            }
        }
    }
});

//! Every catalog command builds a frame from arbitrary `key=value` text.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trafficlink_core::{CommandArgs, CommandKind};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(args) = CommandArgs::parse_pairs(text.split_whitespace()) else {
        return;
    };
    for kind in CommandKind::ALL {
        let spec = kind.build(&args);
        assert!(!spec.encode().is_empty());
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_di_analyzer::{Analyzer, FactSet};

// Any fact set that parses must analyze without panicking; malformed traces
// are skipped, never fatal, under the default options.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(facts) = FactSet::from_json_str(text) else {
        return;
    };

    let report = Analyzer::default().analyze(&facts).expect("default options never fail a run");
    assert_eq!(
        report.stats.procedures_analyzed + report.stats.procedures_skipped,
        facts.procedures.len()
    );
});

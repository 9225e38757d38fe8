#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_di_analyzer::scope::{analyze_procedure, EscapeSink};
use ferrous_di_analyzer::{
    Acquisition, HandleKind, ProcedureTrace, ScopeEvent, SourceLocation, TraceBlock,
};

const HANDLES: [&str; 3] = ["a", "b", "c"];
const VALUES: [&str; 4] = ["x", "y", "a", "unknown"];

// Builds an arbitrary control-flow graph from the input bytes. Every trace
// must either analyze or fail with a trace error, and must terminate.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let block_count = usize::from(data[0] % 8) + 1;
    let mut blocks: Vec<TraceBlock> = (0..block_count).map(|_| TraceBlock::default()).collect();

    for (i, chunk) in data[1..].chunks(3).enumerate() {
        let [op, a, b] = match chunk {
            [op, a, b] => [*op, *a, *b],
            _ => break,
        };
        let block = usize::from(a) % block_count;
        let at = SourceLocation::new("Fuzz.cs", i as u32 + 1, 1);
        let handle = HANDLES[usize::from(b) % HANDLES.len()].to_string();
        let value = VALUES[usize::from(b) % VALUES.len()].to_string();

        let event = match op % 6 {
            0 => ScopeEvent::Create {
                handle,
                kind: if b & 0x80 == 0 { HandleKind::Scope } else { HandleKind::RootProvider },
                is_async: b & 0x40 != 0,
                acquisition: match b % 3 {
                    0 => Acquisition::Manual,
                    1 => Acquisition::Using,
                    _ => Acquisition::AwaitUsing,
                },
                location: at,
            },
            1 => ScopeEvent::Dispose { handle, location: at },
            2 => ScopeEvent::Resolve { handle, result: value, location: at },
            3 => ScopeEvent::Escape { value, sink: EscapeSink::Return, location: at },
            4 => ScopeEvent::Use { value, location: at },
            _ => {
                // Out-of-range successors are allowed through on purpose.
                blocks[block].successors.push(usize::from(b) % (block_count + 1));
                continue;
            }
        };
        blocks[block].events.push(event);
    }

    let trace = ProcedureTrace::new("Fuzz.Run", data[0] & 0x80 != 0, blocks);
    let _ = analyze_procedure(&trace);
});

#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_rbtree::model::{run_compact_equivalence, CompactOp};

fuzz_target!(|ops: Vec<CompactOp>| { run_compact_equivalence(ops) });

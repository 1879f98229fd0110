//! Canonical IL pretty-printer
//!
//! Emits one instruction per line with metadata comments after the
//! line they scope to. Parsing the output reconstructs the CFG and
//! metadata exactly.

use mica_ir::{Cfg, MetadataStore, Scope};
use std::fmt::Write;

/// Render `cfg` and its metadata as canonical IL text.
pub fn print(cfg: &Cfg, meta: &MetadataStore) -> String {
    let mut out = String::new();

    for (scope, key, values) in meta.iter() {
        if matches!(scope, Scope::Cfg) {
            let _ = writeln!(out, ";#!{key}: {}", values.join(" "));
        }
    }

    for block in cfg.blocks() {
        let _ = writeln!(out, "@{}:", block.label());
        for (scope, key, values) in meta.iter_block(block.label()) {
            if matches!(scope, Scope::Block(_)) {
                let _ = writeln!(out, "    ;@!{key}: {}", values.join(" "));
            }
        }
        for (index, instr) in block.instructions().iter().enumerate() {
            let _ = writeln!(out, "    {instr}");
            let scope = Scope::instr(block.label(), index);
            for (entry_scope, key, values) in meta.iter_block(block.label()) {
                if entry_scope == &scope {
                    let _ = writeln!(out, "    ;%!{key}: {}", values.join(" "));
                }
            }
        }
    }
    out
}

//! Stock passes over parsed programs

use mica_common::CancelToken;
use mica_ir::{Instruction, MetadataStore, Operand, Scope};
use mica_parser::{parse, print};
use mica_passes::passes::stats;
use mica_passes::{parse_pipeline, PassManager};
use pretty_assertions::assert_eq;

fn run_pipeline(source: &str, pipeline: &str) -> (mica_ir::Cfg, MetadataStore, PassManager) {
    let (mut cfg, mut meta) = parse(source).unwrap();
    let mut manager = PassManager::with_default_passes();
    let steps = parse_pipeline(pipeline).unwrap();
    let cancel = CancelToken::new();
    manager
        .run_pipeline(&steps, &mut cfg, &mut meta, &cancel)
        .unwrap();
    cfg.validate().unwrap();
    (cfg, meta, manager)
}

#[test]
fn stats_records_counts() {
    let source = "\
@entry:
    %i = 0
    goto @loop
@loop:
    %j = phi [%i, @entry], [%k, @loop]
    %k = %j + 1
    %c = %k < 10
    branch %c ? @loop : @done
@done:
    exit
";
    let (_, meta, _) = run_pipeline(source, "stats");
    assert_eq!(stats::block_count(&meta), Some(3));
    assert_eq!(stats::instr_count(&meta), Some(7));
    assert_eq!(stats::phi_count(&meta), Some(1));
}

#[test]
fn cfold_folds_constant_chains() {
    let source = "\
@entry:
    %a = 6 * 7
    %b = 1 << 4
    %c = %a + %b
    write %c
    exit
";
    let (cfg, _, _) = run_pipeline(source, "cfold");
    let entry = cfg.block("entry").unwrap();
    assert_eq!(
        entry.instructions()[0],
        Instruction::mov("a", Operand::constant(42)).unwrap()
    );
    assert_eq!(
        entry.instructions()[1],
        Instruction::mov("b", Operand::constant(16)).unwrap()
    );
    // %a + %b is not const-const; a single sweep leaves it alone.
    assert!(matches!(
        entry.instructions()[2],
        Instruction::Binary { .. }
    ));
}

#[test]
fn cfold_keeps_trapping_operations() {
    let source = "\
@entry:
    %a = 1 / 0
    write %a
    exit
";
    let (cfg, _, _) = run_pipeline(source, "cfold(3)");
    assert!(matches!(
        cfg.block("entry").unwrap().instructions()[0],
        Instruction::Binary { .. }
    ));
}

#[test]
fn cfold_collapses_identical_branch_arms() {
    let source = "\
@entry:
    read %c
    branch %c ? @next : @next
@next:
    exit
";
    let (cfg, _, _) = run_pipeline(source, "cfold");
    assert_eq!(
        cfg.block("entry").unwrap().terminator(),
        Some(&Instruction::goto("next").unwrap())
    );
}

#[test]
fn cfold_preserves_stats() {
    let source = "\
@entry:
    %a = 2 + 2
    write %a
    exit
";
    let (_, _, manager) = run_pipeline(source, "stats, cfold, stats");
    let key = mica_passes::InstanceKey::new("stats", vec![]);
    assert_eq!(manager.runs(&key), 1);
}

#[test]
fn dce_removes_unused_chains_and_keeps_io() {
    let source = "\
@entry:
    read %n
    %dead = %n * %n
    %alive = %n + 1
    write %alive
    exit
";
    let (cfg, _, _) = run_pipeline(source, "dce");
    let entry = cfg.block("entry").unwrap();
    assert_eq!(entry.len(), 4);
    // read stays (it consumes input) even though %n is now also used;
    // the square is gone.
    assert!(entry
        .instructions()
        .iter()
        .all(|instr| instr.def() != Some("dead")));
}

#[test]
fn dce_keeps_possible_traps() {
    let source = "\
@entry:
    read %n
    %maybe = 1 / %n
    %safe = %n / 2
    exit
";
    let (cfg, _, _) = run_pipeline(source, "dce");
    let entry = cfg.block("entry").unwrap();
    // 1 / %n can trap on zero input and must stay; %n / 2 cannot.
    assert!(entry
        .instructions()
        .iter()
        .any(|instr| instr.def() == Some("maybe")));
    assert!(entry
        .instructions()
        .iter()
        .all(|instr| instr.def() != Some("safe")));
}

#[test]
fn dce_moves_instruction_metadata() {
    let source = "\
@entry:
    %dead = 1 ;%!tag: dead
    read %n ;%!tag: keep
    write %n
    exit
";
    let (_, meta, _) = run_pipeline(source, "dce");
    // The dead move's entry is dropped; the read's entry shifts from
    // index 1 to index 0.
    assert_eq!(meta.get_first(&Scope::instr("entry", 0), "tag"), Some("keep"));
    assert_eq!(meta.get(&Scope::instr("entry", 1), "tag"), None);
}

#[test]
fn simplify_drops_unreachable_and_merges() {
    let source = "\
@entry:
    %x = 1
    goto @mid
@mid:
    %y = %x + 1
    goto @out
@out:
    write %y
    exit
@island:
    goto @island2
@island2:
    goto @island
";
    // The islands keep each other alive through a cycle of
    // predecessors; only reachability from the entry finds them dead.
    let (cfg, meta, _) = run_pipeline(source, "simplify");

    assert!(!cfg.contains("island"));
    assert!(!cfg.contains("island2"));
    // entry, mid, out merged into one straight line.
    assert_eq!(cfg.len(), 1);
    let entry = cfg.block("entry").unwrap();
    assert_eq!(entry.terminator(), Some(&Instruction::exit()));
    assert_eq!(print(&cfg, &meta).matches("write %y").count(), 1);
}

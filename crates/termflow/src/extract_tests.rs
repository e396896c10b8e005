use crate::expr::{BinaryOp, ExprArena, NodeId, NodeKind, UnaryOp};
use crate::extract::{TerminalExtractor, VisitedBits};
use crate::ir::{TerminalRef, TerminalSet};
use crate::AnalysisError;
use num_bigint::BigUint;

fn refs(items: &[(&str, usize)]) -> TerminalSet {
    items
        .iter()
        .map(|(name, bit)| TerminalRef::new(*name, *bit))
        .collect()
}

fn terminals(arena: &ExprArena, root: NodeId, bit: usize) -> TerminalSet {
    TerminalExtractor::new(arena, 64)
        .terminals(root, bit)
        .expect("extraction failed")
}

#[test]
fn terminal_is_its_own_driver() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 4);
    assert_eq!(terminals(&arena, a, 2), refs(&[("TOP.a", 2)]));
}

#[test]
fn constant_has_no_drivers() {
    let mut arena = ExprArena::new();
    let c = arena.constant(5u32, 4);
    assert!(terminals(&arena, c, 0).is_empty());
}

#[test]
fn concat_maps_each_bit_to_one_part() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 1);
    let b = arena.terminal("TOP.b", 1);
    let cat = arena.concat(&[a, b]);
    assert_eq!(terminals(&arena, cat, 1), refs(&[("TOP.a", 0)]));
    assert_eq!(terminals(&arena, cat, 0), refs(&[("TOP.b", 0)]));
}

#[test]
fn concat_with_unequal_parts() {
    let mut arena = ExprArena::new();
    let hi = arena.terminal("TOP.hi", 3);
    let mid = arena.terminal("TOP.mid", 2);
    let lo = arena.terminal("TOP.lo", 4);
    let cat = arena.concat(&[hi, mid, lo]);
    assert_eq!(terminals(&arena, cat, 3), refs(&[("TOP.lo", 3)]));
    assert_eq!(terminals(&arena, cat, 4), refs(&[("TOP.mid", 0)]));
    assert_eq!(terminals(&arena, cat, 5), refs(&[("TOP.mid", 1)]));
    assert_eq!(terminals(&arena, cat, 8), refs(&[("TOP.hi", 2)]));
}

#[test]
fn partselect_shifts_into_operand_space() {
    let mut arena = ExprArena::new();
    let w = arena.terminal("TOP.w", 16);
    let hi = arena.partselect(w, 15, 8);
    assert_eq!(terminals(&arena, hi, 3), refs(&[("TOP.w", 11)]));
}

#[test]
fn nested_partselect_of_concat() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 4);
    let b = arena.terminal("TOP.b", 4);
    let cat = arena.concat(&[a, b]);
    let mid = arena.partselect(cat, 5, 2);
    assert_eq!(terminals(&arena, mid, 0), refs(&[("TOP.b", 2)]));
    assert_eq!(terminals(&arena, mid, 3), refs(&[("TOP.a", 1)]));
}

#[test]
fn constant_pointer_selects_one_bit() {
    let mut arena = ExprArena::new();
    let w = arena.terminal("TOP.w", 8);
    let five = arena.constant(5u32, 3);
    let sel = arena.pointer(w, five);
    assert_eq!(terminals(&arena, sel, 0), refs(&[("TOP.w", 5)]));
}

#[test]
fn dynamic_pointer_reads_index_and_every_element() {
    let mut arena = ExprArena::new();
    let w = arena.terminal("TOP.w", 4);
    let i = arena.terminal("TOP.i", 2);
    let sel = arena.pointer(w, i);
    assert_eq!(
        terminals(&arena, sel, 0),
        refs(&[
            ("TOP.i", 0),
            ("TOP.i", 1),
            ("TOP.w", 0),
            ("TOP.w", 1),
            ("TOP.w", 2),
            ("TOP.w", 3),
        ])
    );
}

#[test]
fn operators_read_every_operand_bit() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 8);
    let b = arena.terminal("TOP.b", 8);
    let sum = arena.binary(a, BinaryOp::Add, b);
    let expected: TerminalSet = (0..8)
        .flat_map(|bit| [TerminalRef::new("TOP.a", bit), TerminalRef::new("TOP.b", bit)])
        .collect();
    for bit in 0..8 {
        assert_eq!(terminals(&arena, sum, bit), expected);
    }
}

#[test]
fn reduction_reads_every_operand_bit() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 3);
    let parity = arena.unary(UnaryOp::Xor, a);
    assert_eq!(
        terminals(&arena, parity, 0),
        refs(&[("TOP.a", 0), ("TOP.a", 1), ("TOP.a", 2)])
    );
}

#[test]
fn mux_unions_condition_and_both_branches() {
    let mut arena = ExprArena::new();
    let c = arena.terminal("TOP.c", 1);
    let x = arena.terminal("TOP.x", 4);
    let y = arena.terminal("TOP.y", 4);
    let mux = arena.mux(c, x, y);
    assert_eq!(
        terminals(&arena, mux, 2),
        refs(&[("TOP.c", 0), ("TOP.x", 2), ("TOP.y", 2)])
    );
}

#[test]
fn mux_with_constant_condition_still_reads_both_branches() {
    let mut arena = ExprArena::new();
    let one = arena.constant(1u32, 1);
    let x = arena.terminal("TOP.x", 1);
    let y = arena.terminal("TOP.y", 1);
    let mux = arena.mux(one, x, y);
    assert_eq!(terminals(&arena, mux, 0), refs(&[("TOP.x", 0), ("TOP.y", 0)]));
}

#[test]
fn narrow_mux_branch_contributes_its_top_bit() {
    let mut arena = ExprArena::new();
    let c = arena.terminal("TOP.c", 1);
    let x = arena.terminal("TOP.x", 4);
    let y = arena.terminal("TOP.y", 2);
    let mux = arena.mux(c, x, y);
    assert_eq!(
        terminals(&arena, mux, 3),
        refs(&[("TOP.c", 0), ("TOP.x", 3), ("TOP.y", 1)])
    );
}

#[test]
fn extract_all_finds_other_node_kinds() {
    let mut arena = ExprArena::new();
    let w = arena.terminal("TOP.w", 4);
    let two = arena.constant(2u32, 2);
    let sel = arena.pointer(w, two);
    let c = arena.terminal("TOP.c", 1);
    let mux = arena.mux(c, sel, c);
    let extractor = TerminalExtractor::new(&arena, 64);
    let mut visited = VisitedBits::default();
    let found = extractor
        .extract_all(mux, &mut visited, 0, NodeKind::Pointer)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(found.contains(&(sel, 0)));
}

#[test]
fn shared_visited_set_short_circuits() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 2);
    let extractor = TerminalExtractor::new(&arena, 64);
    let mut visited = VisitedBits::default();
    let first = extractor
        .extract_all(a, &mut visited, 1, NodeKind::Terminal)
        .unwrap();
    let second = extractor
        .extract_all(a, &mut visited, 1, NodeKind::Terminal)
        .unwrap();
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn shared_subtree_is_walked_once_per_bit() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 4);
    let b = arena.terminal("TOP.b", 4);
    let mut expr = arena.binary(a, BinaryOp::Xor, b);
    for _ in 0..32 {
        // Both operands are the same node, so the tree doubles each level.
        expr = arena.binary(expr, BinaryOp::And, expr);
    }
    let extractor = TerminalExtractor::new(&arena, 64);
    let mut visited = VisitedBits::default();
    extractor
        .extract_all(expr, &mut visited, 0, NodeKind::Terminal)
        .unwrap();
    assert!(visited.values().all(|bits| bits.len() <= 4));
}

#[test]
fn out_of_range_bit_is_malformed() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 4);
    let err = TerminalExtractor::new(&arena, 64).terminals(a, 4).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::MalformedBitRange {
            expr: "TOP.a".to_string(),
            bit: 4,
            width: 4,
        }
    );
}

#[test]
fn partselect_beyond_operand_is_malformed() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 4);
    let sel = arena.partselect(a, 7, 4);
    let err = TerminalExtractor::new(&arena, 64).terminals(sel, 0).unwrap_err();
    assert!(matches!(err, AnalysisError::MalformedBitRange { bit: 7, width: 4, .. }));
}

#[test]
fn constant_pointer_beyond_operand_is_malformed() {
    let mut arena = ExprArena::new();
    let a = arena.terminal("TOP.a", 4);
    let nine = arena.constant(9u32, 4);
    let sel = arena.pointer(a, nine);
    let err = TerminalExtractor::new(&arena, 64).terminals(sel, 0).unwrap_err();
    assert!(matches!(err, AnalysisError::MalformedBitRange { bit: 9, width: 4, .. }));
}

#[test]
fn constant_pointer_wider_than_usize_is_malformed() {
    let mut arena = ExprArena::new();
    let w = arena.terminal("TOP.w", 4);
    let huge = arena.constant(BigUint::from(1u8) << 70usize, 71);
    let sel = arena.pointer(w, huge);
    let err = TerminalExtractor::new(&arena, 64).terminals(sel, 0).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::MalformedBitRange {
            expr: "TOP.w[71'd1180591620717411303424]".to_string(),
            bit: usize::MAX,
            width: 4,
        }
    );
}

#[test]
fn deep_nesting_hits_depth_limit() {
    let mut arena = ExprArena::new();
    let mut expr = arena.terminal("TOP.a", 1);
    for _ in 0..100 {
        expr = arena.unary(UnaryOp::Not, expr);
    }
    let err = TerminalExtractor::new(&arena, 50).terminals(expr, 0).unwrap_err();
    assert_eq!(err, AnalysisError::DepthLimitExceeded { limit: 50 });
    assert!(TerminalExtractor::new(&arena, 100).terminals(expr, 0).is_ok());
}

//! Bit-precise dependency analysis over elaborated HDL dataflow.
//!
//! Given the term table and bind table produced by a dataflow extractor,
//! [`analyze`] walks every bit of every driven signal, descends its bind
//! expression and records which terminal bits feed it.
mod analysis;
mod config;
mod dump;
mod expr;
mod extract;
mod ir;
mod loops;
pub mod report;
mod walker;

pub(crate) use fxhash::FxHashMap as HashMap;
pub(crate) use fxhash::FxHashSet as HashSet;

pub use analysis::{AnalysisError, AnalysisReport, DependencyMaps, SignalFailure, analyze};
pub use config::{AnalysisConfig, ConfigError};
pub use dump::{BindDump, DataflowDump, DumpError, Expr, TermDump};
pub use expr::{BinaryOp, ExprArena, ExprNode, NodeDisplay, NodeId, NodeKind, UnaryOp};
pub use extract::{TerminalExtractor, VisitedBits};
pub use ir::{
    BindRecord, BindTable, BitAccess, BitTarget, Dataflow, Design, DesignBuilder, TermInfo,
    TermKind, TermTable, TerminalRef, TerminalSet,
};
pub use loops::{RegisterLoop, fsm_candidates, register_loops};
pub use num_bigint::BigUint;
pub use walker::{BitCursor, BitWalker};

#[cfg(test)]
mod extract_tests;

use crate::expr::{ExprArena, NodeId};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

mod builder;
pub use builder::DesignBuilder;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct BitAccess {
    pub lsb: usize,
    pub msb: usize,
}
impl BitAccess {
    pub fn new(lsb: usize, msb: usize) -> Self {
        debug_assert!(lsb <= msb, "lsb must be less than or equal to msb");
        Self { lsb, msb }
    }
    pub fn width(&self) -> usize {
        self.msb - self.lsb + 1
    }
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.msb < other.lsb || other.msb < self.lsb)
    }
    pub fn contains(&self, other: &Self) -> bool {
        self.lsb <= other.lsb && other.msb <= self.msb
    }
    pub fn bits(&self) -> std::ops::RangeInclusive<usize> {
        self.lsb..=self.msb
    }
}
impl fmt::Display for BitAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lsb == self.msb {
            write!(f, "[{}]", self.lsb)
        } else {
            write!(f, "[{}:{}]", self.msb, self.lsb)
        }
    }
}

/// Declared role of a signal in the elaborated design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Reg,
    Wire,
    /// Pass-through alias introduced by the extractor; never a storage element.
    Rename,
    Parameter,
    Other,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TermKind::Reg => "Reg",
            TermKind::Wire => "Wire",
            TermKind::Rename => "Rename",
            TermKind::Parameter => "Parameter",
            TermKind::Other => "Other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermInfo {
    pub width: usize,
    pub lsb: usize,
    pub kind: TermKind,
}

impl TermInfo {
    pub fn new(width: usize, lsb: usize, kind: TermKind) -> Self {
        debug_assert!(width > 0, "signal width must be at least one bit");
        Self { width, lsb, kind }
    }

    /// Declared bit range `[lsb + width - 1 : lsb]`.
    pub fn access(&self) -> BitAccess {
        BitAccess::new(self.lsb, self.lsb + self.width - 1)
    }

    pub fn msb(&self) -> usize {
        self.lsb + self.width - 1
    }
}

/// One assignment driving a signal, or a slice of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindRecord {
    pub tree: NodeId,
    /// Absolute driven range. `None` drives the whole signal.
    pub range: Option<BitAccess>,
}

impl BindRecord {
    pub fn new(tree: NodeId) -> Self {
        Self { tree, range: None }
    }

    pub fn with_range(tree: NodeId, msb: usize, lsb: usize) -> Self {
        Self {
            tree,
            range: Some(BitAccess::new(lsb, msb)),
        }
    }

    pub fn driven_range(&self, term: &TermInfo) -> BitAccess {
        self.range.unwrap_or_else(|| term.access())
    }
}

pub type TermTable = BTreeMap<String, TermInfo>;
pub type BindTable = BTreeMap<String, Vec<BindRecord>>;

/// One view (raw or constant-resolved) of an elaborated design.
#[derive(Debug, Clone, Default)]
pub struct Design {
    pub arena: ExprArena,
    pub terms: TermTable,
    pub binds: BindTable,
    /// Signals whose binds could not be represented, with the reason.
    pub rejected: BTreeMap<String, crate::AnalysisError>,
}

impl Design {
    pub fn builder() -> DesignBuilder {
        DesignBuilder::new()
    }

    pub fn term(&self, name: &str) -> Option<&TermInfo> {
        self.terms.get(name)
    }

    pub fn binds_of(&self, name: &str) -> &[BindRecord] {
        self.binds.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Raw and constant-resolved views of the same design.
#[derive(Debug, Clone, Default)]
pub struct Dataflow {
    pub top_module: Option<String>,
    pub raw: Design,
    pub resolved: Design,
}

impl Dataflow {
    pub fn new(raw: Design, resolved: Design) -> Self {
        Self {
            top_module: None,
            raw,
            resolved,
        }
    }

    /// A dataflow whose resolved view is identical to the raw one.
    pub fn unresolved(design: Design) -> Self {
        Self::new(design.clone(), design)
    }
}

/// A single bit of a driven signal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitTarget {
    pub signal: String,
    pub bit: usize,
}

impl BitTarget {
    pub fn new(signal: impl Into<String>, bit: usize) -> Self {
        Self {
            signal: signal.into(),
            bit,
        }
    }
}

impl fmt::Display for BitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.signal, self.bit)
    }
}

impl Serialize for BitTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A bit of a terminal signal that a driven bit depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TerminalRef {
    pub name: String,
    pub bit: usize,
}

impl TerminalRef {
    pub fn new(name: impl Into<String>, bit: usize) -> Self {
        Self {
            name: name.into(),
            bit,
        }
    }
}

impl fmt::Display for TerminalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.bit)
    }
}

impl Serialize for TerminalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub type TerminalSet = BTreeSet<TerminalRef>;

use crate::analysis::AnalysisError;
use crate::expr::{ExprArena, NodeId};
use crate::ir::{BindRecord, Design, TermInfo, TermKind};

/// Incremental construction of a [`Design`].
///
/// Expression nodes are allocated through [`DesignBuilder::arena`] and then
/// attached to signals with [`DesignBuilder::bind`] or
/// [`DesignBuilder::bind_range`].
#[derive(Debug, Default)]
pub struct DesignBuilder {
    design: Design,
}

impl DesignBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&mut self) -> &mut ExprArena {
        &mut self.design.arena
    }

    /// Declare `name`. A zero-width declaration rejects the signal instead.
    pub fn term(&mut self, name: &str, width: usize, lsb: usize, kind: TermKind) -> &mut Self {
        if width == 0 {
            return self.reject(
                name,
                AnalysisError::MalformedBitRange {
                    expr: name.to_string(),
                    bit: lsb,
                    width,
                },
            );
        }
        self.design
            .terms
            .insert(name.to_string(), TermInfo::new(width, lsb, kind));
        self
    }

    /// Drive the whole of `name` with `tree`.
    pub fn bind(&mut self, name: &str, tree: NodeId) -> &mut Self {
        self.push_bind(name, BindRecord::new(tree))
    }

    /// Drive `name[msb:lsb]` (absolute indices) with `tree`. An inverted
    /// range rejects the signal.
    pub fn bind_range(&mut self, name: &str, tree: NodeId, msb: usize, lsb: usize) -> &mut Self {
        if msb < lsb {
            return self.reject(
                name,
                AnalysisError::MalformedBitRange {
                    expr: format!("{}[{}:{}]", name, msb, lsb),
                    bit: lsb,
                    width: msb + 1,
                },
            );
        }
        self.push_bind(name, BindRecord::with_range(tree, msb, lsb))
    }

    pub(crate) fn push_bind(&mut self, name: &str, record: BindRecord) -> &mut Self {
        if self.design.rejected.contains_key(name) {
            return self;
        }
        self.design
            .binds
            .entry(name.to_string())
            .or_default()
            .push(record);
        self
    }

    pub(crate) fn reject(&mut self, name: &str, error: AnalysisError) -> &mut Self {
        self.design.binds.remove(name);
        self.design.rejected.insert(name.to_string(), error);
        self
    }

    pub fn build(self) -> Design {
        self.design
    }
}

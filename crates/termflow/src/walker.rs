use crate::ir::{BindRecord, BitTarget, Design, TermInfo, TermKind};

/// Position of the walk: one bit of a signal, seen through one of its binds.
#[derive(Debug, Clone, Copy)]
pub struct BitCursor<'a> {
    pub name: &'a str,
    pub term: &'a TermInfo,
    pub bind: &'a BindRecord,
    /// Absolute bit index within the signal's declared range.
    pub bit: usize,
    /// Least significant absolute bit driven by `bind`.
    pub lsb: usize,
}

impl BitCursor<'_> {
    /// Offset of the cursor inside the bind's expression.
    pub fn local_bit(&self) -> usize {
        self.bit - self.lsb
    }

    pub fn target(&self) -> BitTarget {
        BitTarget::new(self.name, self.bit)
    }
}

/// Per-bit iteration over every driven, non-rename signal of a design.
///
/// Order: signals in bind table order, then each signal's binds in table
/// order, then bits ascending over the bind's driven range. Every call to
/// [`BitWalker::iter`] starts from scratch.
#[derive(Debug, Clone, Copy)]
pub struct BitWalker<'a> {
    design: &'a Design,
    scope: Option<&'a str>,
}

impl<'a> BitWalker<'a> {
    pub fn new(design: &'a Design) -> Self {
        Self {
            design,
            scope: None,
        }
    }

    /// Restrict the walk to signals under the hierarchical prefix `scope`.
    pub fn with_scope(mut self, scope: Option<&'a str>) -> Self {
        self.scope = scope;
        self
    }

    pub(crate) fn in_scope(&self, name: &str) -> bool {
        match self.scope {
            None => true,
            Some(scope) => {
                name == scope
                    || name
                        .strip_prefix(scope)
                        .is_some_and(|rest| rest.starts_with('.'))
            }
        }
    }

    /// Bound signals that are walked, with their metadata and binds.
    pub fn signals(&self) -> impl Iterator<Item = (&'a str, &'a TermInfo, &'a [BindRecord])> + '_ {
        let design = self.design;
        design
            .binds
            .iter()
            .filter(|(name, _)| self.in_scope(name))
            .filter_map(move |(name, binds)| {
                let term = design.terms.get(name)?;
                (term.kind != TermKind::Rename).then_some((name.as_str(), term, binds.as_slice()))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = BitCursor<'a>> + '_ {
        self.signals().flat_map(|(name, term, binds)| {
            binds.iter().flat_map(move |bind| {
                let range = bind.driven_range(term);
                range.bits().map(move |bit| BitCursor {
                    name,
                    term,
                    bind,
                    bit,
                    lsb: range.lsb,
                })
            })
        })
    }

    /// Bound signals with no term metadata; the walk passes over them.
    /// Entries without any bind record drive nothing and are not listed.
    pub fn skipped_signals(&self) -> Vec<&'a str> {
        self.design
            .binds
            .iter()
            .filter(|(name, binds)| {
                !binds.is_empty()
                    && self.in_scope(name)
                    && !self.design.terms.contains_key(name.as_str())
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

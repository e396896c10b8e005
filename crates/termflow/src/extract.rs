use crate::analysis::AnalysisError;
use crate::expr::{ExprArena, ExprNode, NodeId, NodeKind};
use crate::ir::{TerminalRef, TerminalSet};
use crate::{HashMap, HashSet};
use bit_set::BitSet;
use num_traits::ToPrimitive;

/// Bits already explored per node during one extraction.
pub type VisitedBits = HashMap<NodeId, BitSet>;

/// Recursive, bit-range-aware search for the nodes that feed one output bit.
///
/// Bit-select, part-select and concatenation boundaries are followed exactly.
/// Operators are not: every bit of every operand is taken as a source, which
/// keeps the result sound (no dependency is lost) at the price of bit
/// exactness through arithmetic. A mux contributes its whole condition and
/// both branches.
pub struct TerminalExtractor<'a> {
    arena: &'a ExprArena,
    max_depth: usize,
}

impl<'a> TerminalExtractor<'a> {
    pub fn new(arena: &'a ExprArena, max_depth: usize) -> Self {
        Self { arena, max_depth }
    }

    /// Collect every node of kind `wanted` reachable from bit `bit` of `node`,
    /// paired with the bit of that node which is read.
    ///
    /// `visited` may be shared between calls; pairs recorded there are not
    /// explored again.
    pub fn extract_all(
        &self,
        node: NodeId,
        visited: &mut VisitedBits,
        bit: usize,
        wanted: NodeKind,
    ) -> Result<HashSet<(NodeId, usize)>, AnalysisError> {
        let mut found = HashSet::default();
        self.walk(node, bit, wanted, 0, visited, &mut found)?;
        Ok(found)
    }

    /// Terminal bits that drive bit `bit` of `node`.
    pub fn terminals(&self, node: NodeId, bit: usize) -> Result<TerminalSet, AnalysisError> {
        let mut visited = VisitedBits::default();
        let found = self.extract_all(node, &mut visited, bit, NodeKind::Terminal)?;
        Ok(found
            .into_iter()
            .filter_map(|(id, bit)| match self.arena.get(id) {
                ExprNode::Terminal { name, .. } => Some(TerminalRef::new(name.as_str(), bit)),
                _ => None,
            })
            .collect())
    }

    fn walk(
        &self,
        node: NodeId,
        bit: usize,
        wanted: NodeKind,
        depth: usize,
        visited: &mut VisitedBits,
        found: &mut HashSet<(NodeId, usize)>,
    ) -> Result<(), AnalysisError> {
        if depth > self.max_depth {
            return Err(AnalysisError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        let width = self.arena.width(node);
        if bit >= width {
            return Err(self.malformed(node, bit, width));
        }
        if !visited.entry(node).or_default().insert(bit) {
            log::trace!("{}[{}] already visited", node, bit);
            return Ok(());
        }

        let expr = self.arena.get(node);
        if expr.kind() == wanted {
            found.insert((node, bit));
        }
        let depth = depth + 1;

        match expr {
            ExprNode::Terminal { .. } | ExprNode::Constant(..) => Ok(()),
            ExprNode::Concat(parts) => {
                // The last part holds the least significant bits.
                let mut offset = bit;
                for (part, part_width) in parts.iter().rev() {
                    if offset < *part_width {
                        return self.walk(*part, offset, wanted, depth, visited, found);
                    }
                    offset -= part_width;
                }
                Err(self.malformed(node, bit, width))
            }
            ExprNode::PartSelect { expr, access } => {
                let inner_width = self.arena.width(*expr);
                if access.msb >= inner_width {
                    return Err(self.malformed(*expr, access.msb, inner_width));
                }
                self.walk(*expr, bit + access.lsb, wanted, depth, visited, found)
            }
            ExprNode::Pointer { expr, index } => match self.arena.get(*index) {
                ExprNode::Constant(value, _) => {
                    // An index past usize::MAX is past any operand width.
                    let selected = value
                        .to_usize()
                        .ok_or_else(|| self.malformed(node, usize::MAX, self.arena.width(*expr)))?;
                    self.walk(*expr, selected + bit, wanted, depth, visited, found)
                }
                _ => {
                    // Any element may be selected at run time; the index is read as well.
                    self.walk_every_bit(*index, wanted, depth, visited, found)?;
                    self.walk_every_bit(*expr, wanted, depth, visited, found)
                }
            },
            ExprNode::Unary(_, inner) => self.walk_every_bit(*inner, wanted, depth, visited, found),
            ExprNode::Binary(lhs, _, rhs) => {
                self.walk_every_bit(*lhs, wanted, depth, visited, found)?;
                self.walk_every_bit(*rhs, wanted, depth, visited, found)
            }
            ExprNode::Mux {
                cond,
                then_expr,
                else_expr,
            } => {
                self.walk_every_bit(*cond, wanted, depth, visited, found)?;
                for branch in [*then_expr, *else_expr] {
                    // A narrower branch is extended; its top bit covers the extension.
                    let branch_bit = bit.min(self.arena.width(branch).saturating_sub(1));
                    self.walk(branch, branch_bit, wanted, depth, visited, found)?;
                }
                Ok(())
            }
        }
    }

    fn walk_every_bit(
        &self,
        node: NodeId,
        wanted: NodeKind,
        depth: usize,
        visited: &mut VisitedBits,
        found: &mut HashSet<(NodeId, usize)>,
    ) -> Result<(), AnalysisError> {
        for bit in 0..self.arena.width(node) {
            self.walk(node, bit, wanted, depth, visited, found)?;
        }
        Ok(())
    }

    fn malformed(&self, node: NodeId, bit: usize, width: usize) -> AnalysisError {
        AnalysisError::MalformedBitRange {
            expr: self.arena.display(node).to_string(),
            bit,
            width,
        }
    }
}

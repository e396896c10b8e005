use crate::HashMap;
use crate::ir::BitAccess;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    LogicNot,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "~",
            UnaryOp::LogicNot => "!",
            UnaryOp::And => "&",
            UnaryOp::Nand => "~&",
            UnaryOp::Or => "|",
            UnaryOp::Nor => "~|",
            UnaryOp::Xor => "^",
            UnaryOp::Xnor => "~^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    And,
    Or,
    Xor,
    Xnor,
    Shl,
    Shr,
    Sar,
    Eq,
    Ne,
    CaseEq,
    CaseNe,
    Lt,
    Le,
    Gt,
    Ge,
    LogicAnd,
    LogicOr,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Xnor => "~^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Sar => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::CaseEq => "===",
            BinaryOp::CaseNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
        }
    }
}

/// Node of a bind expression tree.
///
/// Bit offsets carried by nodes are always relative to the operand's own
/// `[0, width)` bit space, never to a signal's declared index range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprNode {
    Terminal {
        name: String,
        width: usize,
    },
    Constant(BigUint, usize),
    Unary(UnaryOp, NodeId),
    Binary(NodeId, BinaryOp, NodeId),
    /// Most significant part first, each with its bit width.
    Concat(Vec<(NodeId, usize)>),
    PartSelect {
        expr: NodeId,
        access: BitAccess,
    },
    /// Single-bit select `expr[index]`.
    Pointer {
        expr: NodeId,
        index: NodeId,
    },
    Mux {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Terminal,
    Constant,
    Unary,
    Binary,
    Concat,
    PartSelect,
    Pointer,
    Mux,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Terminal => "terminal",
            NodeKind::Constant => "constant",
            NodeKind::Unary => "unary",
            NodeKind::Binary => "binary",
            NodeKind::Concat => "concat",
            NodeKind::PartSelect => "partselect",
            NodeKind::Pointer => "pointer",
            NodeKind::Mux => "mux",
        };
        f.write_str(s)
    }
}

impl ExprNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ExprNode::Terminal { .. } => NodeKind::Terminal,
            ExprNode::Constant(..) => NodeKind::Constant,
            ExprNode::Unary(..) => NodeKind::Unary,
            ExprNode::Binary(..) => NodeKind::Binary,
            ExprNode::Concat(_) => NodeKind::Concat,
            ExprNode::PartSelect { .. } => NodeKind::PartSelect,
            ExprNode::Pointer { .. } => NodeKind::Pointer,
            ExprNode::Mux { .. } => NodeKind::Mux,
        }
    }
}

/// Hash-consed storage for expression trees. Structurally equal sub-trees
/// share one [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
    widths: Vec<usize>,
    cache: HashMap<ExprNode, NodeId>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: ExprNode) -> NodeId {
        if let Some(id) = self.cache.get(&node) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        let width = self.compute_width(&node);
        self.cache.insert(node.clone(), id);
        self.nodes.push(node);
        self.widths.push(width);
        id
    }

    pub fn get(&self, id: NodeId) -> &ExprNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn terminal(&mut self, name: &str, width: usize) -> NodeId {
        self.alloc(ExprNode::Terminal {
            name: name.to_string(),
            width,
        })
    }

    pub fn constant(&mut self, value: impl Into<BigUint>, width: usize) -> NodeId {
        self.alloc(ExprNode::Constant(value.into(), width))
    }

    pub fn unary(&mut self, op: UnaryOp, inner: NodeId) -> NodeId {
        self.alloc(ExprNode::Unary(op, inner))
    }

    pub fn binary(&mut self, lhs: NodeId, op: BinaryOp, rhs: NodeId) -> NodeId {
        self.alloc(ExprNode::Binary(lhs, op, rhs))
    }

    /// `{parts[0], parts[1], ...}` with widths taken from the parts themselves.
    pub fn concat(&mut self, parts: &[NodeId]) -> NodeId {
        let parts = parts.iter().map(|&p| (p, self.width(p))).collect();
        self.alloc(ExprNode::Concat(parts))
    }

    pub fn partselect(&mut self, expr: NodeId, msb: usize, lsb: usize) -> NodeId {
        self.alloc(ExprNode::PartSelect {
            expr,
            access: BitAccess::new(lsb, msb),
        })
    }

    pub fn pointer(&mut self, expr: NodeId, index: NodeId) -> NodeId {
        self.alloc(ExprNode::Pointer { expr, index })
    }

    pub fn mux(&mut self, cond: NodeId, then_expr: NodeId, else_expr: NodeId) -> NodeId {
        self.alloc(ExprNode::Mux {
            cond,
            then_expr,
            else_expr,
        })
    }

    pub fn width(&self, id: NodeId) -> usize {
        self.widths[id.0]
    }

    // Children are always allocated before their parent, so their widths are known.
    fn compute_width(&self, node: &ExprNode) -> usize {
        match node {
            ExprNode::Terminal { width, .. } => *width,
            ExprNode::Constant(_, width) => *width,
            ExprNode::Binary(lhs, op, rhs) => match op {
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::CaseEq
                | BinaryOp::CaseNe
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::LogicAnd
                | BinaryOp::LogicOr => 1,
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Sar | BinaryOp::Pow => self.width(*lhs),
                _ => self.width(*lhs).max(self.width(*rhs)),
            },
            ExprNode::Unary(op, inner) => match op {
                UnaryOp::LogicNot
                | UnaryOp::And
                | UnaryOp::Nand
                | UnaryOp::Or
                | UnaryOp::Nor
                | UnaryOp::Xor
                | UnaryOp::Xnor => 1,
                UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Not => self.width(*inner),
            },
            ExprNode::Concat(parts) => parts.iter().map(|(_, w)| *w).sum(),
            ExprNode::PartSelect { access, .. } => access.width(),
            ExprNode::Pointer { .. } => 1,
            ExprNode::Mux {
                then_expr,
                else_expr,
                ..
            } => self.width(*then_expr).max(self.width(*else_expr)),
        }
    }

    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { arena: self, id }
    }

    fn fmt_expression(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get(id) {
            ExprNode::Terminal { name, .. } => write!(f, "{}", name),
            ExprNode::Constant(value, width) => write!(f, "{}'d{}", width, value),
            ExprNode::Unary(op, inner) => {
                write!(f, "{}", op.symbol())?;
                self.fmt_expression(*inner, f)
            }
            ExprNode::Binary(lhs, op, rhs) => {
                write!(f, "(")?;
                self.fmt_expression(*lhs, f)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_expression(*rhs, f)?;
                write!(f, ")")
            }
            ExprNode::Concat(parts) => {
                write!(f, "{{")?;
                for (i, (part, _)) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.fmt_expression(*part, f)?;
                }
                write!(f, "}}")
            }
            ExprNode::PartSelect { expr, access } => {
                self.fmt_expression(*expr, f)?;
                write!(f, "[{}:{}]", access.msb, access.lsb)
            }
            ExprNode::Pointer { expr, index } => {
                self.fmt_expression(*expr, f)?;
                write!(f, "[")?;
                self.fmt_expression(*index, f)?;
                write!(f, "]")
            }
            ExprNode::Mux {
                cond,
                then_expr,
                else_expr,
            } => {
                write!(f, "(")?;
                self.fmt_expression(*cond, f)?;
                write!(f, " ? ")?;
                self.fmt_expression(*then_expr, f)?;
                write!(f, " : ")?;
                self.fmt_expression(*else_expr, f)?;
                write!(f, ")")
            }
        }
    }
}

pub struct NodeDisplay<'a> {
    arena: &'a ExprArena,
    id: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.arena.fmt_expression(self.id, f)
    }
}

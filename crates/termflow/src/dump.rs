//! JSON hand-off format between a dataflow extractor and the analysis.
use crate::analysis::AnalysisError;
use crate::expr::{BinaryOp, ExprArena, NodeId, UnaryOp};
use crate::ir::{BindRecord, Dataflow, Design, DesignBuilder, TermKind};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("failed to read dataflow dump `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dataflow dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signal `{signal}` is declared with zero width")]
    ZeroWidth { signal: String },

    #[error("bind of `{signal}` has an incomplete or inverted driven range")]
    InvalidRange { signal: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDump {
    pub width: usize,
    #[serde(default)]
    pub lsb: usize,
    pub kind: TermKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindDump {
    pub tree: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msb: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsb: Option<usize>,
}

/// Nested expression tree as written by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Terminal {
        name: String,
        width: usize,
    },
    Constant {
        #[serde(with = "decimal")]
        value: BigUint,
        width: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Concat {
        parts: Vec<Expr>,
    },
    Partselect {
        operand: Box<Expr>,
        msb: usize,
        lsb: usize,
    },
    Pointer {
        operand: Box<Expr>,
        index: Box<Expr>,
    },
    Mux {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// Any node kind this crate does not model.
    #[serde(other)]
    Unsupported,
}

impl Expr {
    /// Allocate the tree in `arena`. Fails on the first node that cannot be
    /// represented; `signal` names the bind in the error. Terminals declared
    /// in `terms` must be referenced at their declared width.
    pub fn intern(
        &self,
        signal: &str,
        terms: &BTreeMap<String, TermDump>,
        arena: &mut ExprArena,
    ) -> Result<NodeId, AnalysisError> {
        let malformed = |expr: String, bit: usize, width: usize| AnalysisError::MalformedBitRange {
            expr,
            bit,
            width,
        };
        Ok(match self {
            Expr::Terminal { name, width } => {
                if *width == 0 {
                    return Err(malformed(name.clone(), 0, 0));
                }
                if let Some(term) = terms.get(name) {
                    if term.width != *width {
                        return Err(malformed(name.clone(), width - 1, term.width));
                    }
                }
                arena.terminal(name, *width)
            }
            Expr::Constant { value, width } => {
                if *width == 0 {
                    return Err(malformed(value.to_string(), 0, 0));
                }
                arena.constant(value.clone(), *width)
            }
            Expr::Unary { op, operand } => {
                let operand = operand.intern(signal, terms, arena)?;
                arena.unary(*op, operand)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.intern(signal, terms, arena)?;
                let rhs = rhs.intern(signal, terms, arena)?;
                arena.binary(lhs, *op, rhs)
            }
            Expr::Concat { parts } => {
                if parts.is_empty() {
                    return Err(malformed("{}".to_string(), 0, 0));
                }
                let parts = parts
                    .iter()
                    .map(|p| p.intern(signal, terms, arena))
                    .collect::<Result<Vec<_>, _>>()?;
                arena.concat(&parts)
            }
            Expr::Partselect { operand, msb, lsb } => {
                let operand = operand.intern(signal, terms, arena)?;
                if msb < lsb {
                    let expr = format!("{}[{}:{}]", arena.display(operand), msb, lsb);
                    return Err(malformed(expr, *lsb, msb + 1));
                }
                arena.partselect(operand, *msb, *lsb)
            }
            Expr::Pointer { operand, index } => {
                let operand = operand.intern(signal, terms, arena)?;
                let index = index.intern(signal, terms, arena)?;
                arena.pointer(operand, index)
            }
            Expr::Mux {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = cond.intern(signal, terms, arena)?;
                let then_expr = then_expr.intern(signal, terms, arena)?;
                let else_expr = else_expr.intern(signal, terms, arena)?;
                arena.mux(cond, then_expr, else_expr)
            }
            Expr::Unsupported => {
                return Err(AnalysisError::UnsupportedNodeKind {
                    signal: signal.to_string(),
                    kind: "unrecognized".to_string(),
                });
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataflowDump {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_module: Option<String>,
    pub terms: BTreeMap<String, TermDump>,
    pub binds: BTreeMap<String, Vec<BindDump>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_terms: Option<BTreeMap<String, TermDump>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_binds: Option<BTreeMap<String, Vec<BindDump>>>,
}

impl DataflowDump {
    pub fn from_json_str(s: &str) -> Result<Self, DumpError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn into_dataflow(self) -> Result<Dataflow, DumpError> {
        let raw = build_design(&self.terms, &self.binds)?;
        let resolved = match (&self.resolved_terms, &self.resolved_binds) {
            (None, None) => raw.clone(),
            (terms, binds) => build_design(
                terms.as_ref().unwrap_or(&self.terms),
                binds.as_ref().unwrap_or(&self.binds),
            )?,
        };
        Ok(Dataflow {
            top_module: self.top_module,
            raw,
            resolved,
        })
    }
}

fn build_design(
    terms: &BTreeMap<String, TermDump>,
    binds: &BTreeMap<String, Vec<BindDump>>,
) -> Result<Design, DumpError> {
    let mut builder = DesignBuilder::new();
    for (name, term) in terms {
        if term.width == 0 {
            return Err(DumpError::ZeroWidth {
                signal: name.clone(),
            });
        }
        builder.term(name, term.width, term.lsb, term.kind);
    }
    'signals: for (name, records) in binds {
        for record in records {
            let tree = match record.tree.intern(name, terms, builder.arena()) {
                Ok(tree) => tree,
                Err(error) => {
                    builder.reject(name, error);
                    continue 'signals;
                }
            };
            let bind = match (record.msb, record.lsb) {
                (None, None) => BindRecord::new(tree),
                (Some(msb), Some(lsb)) if lsb <= msb => BindRecord::with_range(tree, msb, lsb),
                _ => {
                    return Err(DumpError::InvalidRange {
                        signal: name.clone(),
                    });
                }
            };
            builder.push_bind(name, bind);
        }
    }
    Ok(builder.build())
}

impl Dataflow {
    pub fn from_json_str(s: &str) -> Result<Self, DumpError> {
        DataflowDump::from_json_str(s)?.into_dataflow()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DumpError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DumpError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|_| D::Error::custom(format!("invalid decimal constant `{}`", text)))
    }
}

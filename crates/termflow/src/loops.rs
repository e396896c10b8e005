use crate::analysis::DependencyMaps;
use crate::config::AnalysisConfig;
use crate::ir::{Design, TermKind};
use crate::{HashMap, HashSet};
use serde::Serialize;

/// A feedback cycle among driven signals that passes through at least one
/// register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterLoop {
    /// Cycle members, sorted by name.
    pub members: Vec<String>,
    /// The single member reads itself.
    pub self_loop: bool,
}

impl RegisterLoop {
    pub fn contains(&self, signal: &str) -> bool {
        self.members.iter().any(|m| m == signal)
    }
}

struct TarjanContext {
    index: usize,
    stack: Vec<usize>,
    on_stack: HashSet<usize>,
    indices: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    sccs: Vec<Vec<usize>>,
}

impl TarjanContext {
    fn visit(&mut self, u: usize) {
        self.indices[u] = Some(self.index);
        self.lowlink[u] = self.index;
        self.index += 1;
        self.stack.push(u);
        self.on_stack.insert(u);
    }
}

// Iterative so that long signal chains cannot exhaust the call stack.
// Each frame is a node and the position of the next edge to visit.
fn strong_connect(root: usize, adj: &[Vec<usize>], ctx: &mut TarjanContext) {
    let mut frames = vec![(root, 0usize)];
    ctx.visit(root);

    while let Some(frame) = frames.last_mut() {
        let u = frame.0;
        if let Some(&v) = adj[u].get(frame.1) {
            frame.1 += 1;
            match ctx.indices[v] {
                None => {
                    ctx.visit(v);
                    frames.push((v, 0));
                }
                Some(index) if ctx.on_stack.contains(&v) => {
                    ctx.lowlink[u] = ctx.lowlink[u].min(index);
                }
                Some(_) => {}
            }
            continue;
        }

        frames.pop();
        if let Some(&(parent, _)) = frames.last() {
            ctx.lowlink[parent] = ctx.lowlink[parent].min(ctx.lowlink[u]);
        }
        if Some(ctx.lowlink[u]) == ctx.indices[u] {
            let mut scc = Vec::new();
            while let Some(w) = ctx.stack.pop() {
                ctx.on_stack.remove(&w);
                scc.push(w);
                if w == u {
                    break;
                }
            }
            ctx.sccs.push(scc);
        }
    }
}

/// Feedback cycles among the signals driven in `design`.
///
/// Nodes are the bound signals; an edge `t -> r` exists when `r` reads `t`
/// according to `maps`. Every strongly connected component that is a real
/// cycle and contains a register is reported.
pub fn register_loops(design: &Design, maps: &DependencyMaps) -> Vec<RegisterLoop> {
    let names: Vec<&str> = design
        .binds
        .keys()
        .filter(|name| {
            design
                .terms
                .get(name.as_str())
                .is_some_and(|t| t.kind != TermKind::Rename)
        })
        .map(String::as_str)
        .collect();
    let ids: HashMap<&str, usize> = names.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let mut adj = vec![Vec::new(); names.len()];
    for (u, name) in names.iter().enumerate() {
        if let Some(readers) = maps.readers(name) {
            adj[u].extend(readers.iter().filter_map(|r| ids.get(r.as_str()).copied()));
        }
    }

    let mut ctx = TarjanContext {
        index: 0,
        stack: Vec::new(),
        on_stack: HashSet::default(),
        indices: vec![None; names.len()],
        lowlink: vec![0; names.len()],
        sccs: Vec::new(),
    };
    for i in 0..names.len() {
        if ctx.indices[i].is_none() {
            strong_connect(i, &adj, &mut ctx);
        }
    }

    let mut loops: Vec<RegisterLoop> = ctx
        .sccs
        .into_iter()
        .filter(|scc| scc.len() > 1 || adj[scc[0]].contains(&scc[0]))
        .filter(|scc| {
            scc.iter()
                .any(|&i| design.terms.get(names[i]).is_some_and(|t| t.kind == TermKind::Reg))
        })
        .map(|scc| {
            let self_loop = scc.len() == 1;
            let mut members: Vec<String> = scc.iter().map(|&i| names[i].to_string()).collect();
            members.sort();
            RegisterLoop { members, self_loop }
        })
        .collect();
    loops.sort_by(|a, b| a.members.cmp(&b.members));
    log::debug!("found {} register loops", loops.len());
    loops
}

/// Loops that look like state machines: some member's leaf name contains one
/// of the configured keywords.
pub fn fsm_candidates<'a>(
    loops: &'a [RegisterLoop],
    config: &AnalysisConfig,
) -> Vec<&'a RegisterLoop> {
    let patterns = config.fsm_patterns();
    loops
        .iter()
        .filter(|l| {
            l.members.iter().any(|m| {
                let leaf = m.rsplit('.').next().unwrap_or(m).to_lowercase();
                patterns.iter().any(|p| leaf.contains(p.as_str()))
            })
        })
        .collect()
}

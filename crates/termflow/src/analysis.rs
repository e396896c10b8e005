use crate::config::AnalysisConfig;
use crate::extract::TerminalExtractor;
use crate::ir::{BitTarget, Dataflow, Design, TerminalSet};
use crate::walker::{BitCursor, BitWalker};
use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Signal `{signal}` is bound but has no term metadata")]
    MissingMetadata { signal: String },

    #[error("Unsupported expression node kind `{kind}` in bind of `{signal}`")]
    UnsupportedNodeKind { signal: String, kind: String },

    #[error("Malformed bit range: bit {bit} of `{expr}` is outside its width {width}")]
    MalformedBitRange {
        expr: String,
        bit: usize,
        width: usize,
    },

    #[error("Expression nesting exceeds the depth limit of {limit}")]
    DepthLimitExceeded { limit: usize },
}

/// Bit-level dependency mappings produced by one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyMaps {
    referenced_by: BTreeMap<String, BTreeSet<String>>,
    drivers_of: BTreeMap<BitTarget, TerminalSet>,
}

impl DependencyMaps {
    /// Terminal bits that drive `signal[bit]` (absolute bit index).
    pub fn drivers(&self, signal: &str, bit: usize) -> Option<&TerminalSet> {
        self.drivers_of.get(&BitTarget::new(signal, bit))
    }

    /// Signals that read `terminal` anywhere in their driving logic.
    pub fn readers(&self, terminal: &str) -> Option<&BTreeSet<String>> {
        self.referenced_by.get(terminal)
    }

    pub fn referenced_by(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.referenced_by
    }

    pub fn drivers_of(&self) -> &BTreeMap<BitTarget, TerminalSet> {
        &self.drivers_of
    }

    /// All terminal bits driving any bit of `signal`.
    pub fn signal_drivers(&self, signal: &str) -> TerminalSet {
        self.drivers_of
            .range(BitTarget::new(signal, 0)..=BitTarget::new(signal, usize::MAX))
            .flat_map(|(_, terms)| terms.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers_of.is_empty() && self.referenced_by.is_empty()
    }

    fn record(&mut self, target: &BitTarget, terminals: TerminalSet) {
        for terminal in &terminals {
            self.referenced_by
                .entry(terminal.name.clone())
                .or_default()
                .insert(target.signal.clone());
        }
        // A bit without terminal sources is still a driven bit.
        self.drivers_of
            .entry(target.clone())
            .or_default()
            .extend(terminals);
    }

    fn merge(&mut self, other: DependencyMaps) {
        for (terminal, readers) in other.referenced_by {
            self.referenced_by.entry(terminal).or_default().extend(readers);
        }
        for (target, terminals) in other.drivers_of {
            self.drivers_of.entry(target).or_default().extend(terminals);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalFailure {
    pub signal: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: AnalysisError,
}

fn serialize_display<S: Serializer>(error: &AnalysisError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of an analysis run: the maps built from every signal that could be
/// analyzed, plus what was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub maps: DependencyMaps,
    /// Bound signals without term metadata.
    pub skipped: Vec<String>,
    pub failures: Vec<SignalFailure>,
}

impl AnalysisReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failures.is_empty()
    }
}

/// Build the dependency maps of one design view.
///
/// Each signal is analyzed into its own maps and merged only when every bit
/// succeeded, so a failing signal leaves no partial entries behind.
pub fn analyze(design: &Design, config: &AnalysisConfig) -> AnalysisReport {
    let walker = BitWalker::new(design).with_scope(config.top_module.as_deref());
    let extractor = TerminalExtractor::new(&design.arena, config.max_depth);
    let mut report = AnalysisReport::default();

    for signal in walker.skipped_signals() {
        log::warn!("{}", AnalysisError::MissingMetadata { signal: signal.to_string() });
        report.skipped.push(signal.to_string());
    }
    for (signal, error) in design.rejected.iter().filter(|(signal, _)| walker.in_scope(signal)) {
        log::warn!("skipping `{}`: {}", signal, error);
        report.failures.push(SignalFailure {
            signal: signal.clone(),
            error: error.clone(),
        });
    }

    for (signal, cursors) in &walker.iter().chunk_by(|cursor| cursor.name) {
        match analyze_signal(&extractor, cursors) {
            Ok(maps) => {
                log::debug!("analyzed `{}` ({} bits)", signal, maps.drivers_of.len());
                report.maps.merge(maps);
            }
            Err(error) => {
                log::warn!("failed to analyze `{}`: {}", signal, error);
                report.failures.push(SignalFailure {
                    signal: signal.to_string(),
                    error,
                });
            }
        }
    }
    report
}

fn analyze_signal<'a>(
    extractor: &TerminalExtractor<'_>,
    cursors: impl Iterator<Item = BitCursor<'a>>,
) -> Result<DependencyMaps, AnalysisError> {
    let mut maps = DependencyMaps::default();
    for cursor in cursors {
        let declared = cursor.term.access();
        let driven = cursor.bind.driven_range(cursor.term);
        if !declared.contains(&driven) {
            return Err(AnalysisError::MalformedBitRange {
                expr: format!("{}{}", cursor.name, driven),
                bit: driven.msb,
                width: cursor.term.width,
            });
        }
        let terminals = extractor.terminals(cursor.bind.tree, cursor.local_bit())?;
        maps.record(&cursor.target(), terminals);
    }
    Ok(maps)
}

impl Dataflow {
    /// Dependency maps over the raw, unresolved bind data.
    pub fn analyze_raw(&self, config: &AnalysisConfig) -> AnalysisReport {
        analyze(&self.raw, config)
    }

    /// Dependency maps over the constant-resolved bind data.
    pub fn analyze_resolved(&self, config: &AnalysisConfig) -> AnalysisReport {
        analyze(&self.resolved, config)
    }
}

//! Text renderings of designs and analysis results.
use crate::analysis::{AnalysisReport, DependencyMaps};
use crate::ir::Design;
use crate::loops::RegisterLoop;
use itertools::Itertools;

fn by_name_length<'a, T>(items: impl Iterator<Item = (&'a String, T)>) -> Vec<(&'a String, T)> {
    items
        .sorted_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .collect()
}

/// Term listing, shortest names first.
pub fn format_terms(design: &Design) -> String {
    let mut output = String::new();
    output.push_str("Term:\n");
    for (name, term) in by_name_length(design.terms.iter()) {
        output.push_str(&format!(
            "(Term name:{} type:{} msb:{} lsb:{})\n",
            name,
            term.kind,
            term.msb(),
            term.lsb
        ));
    }
    output
}

/// Bind listing, shortest names first, binds in table order.
pub fn format_binds(design: &Design) -> String {
    let mut output = String::new();
    output.push_str("Bind:\n");
    for (name, binds) in by_name_length(design.binds.iter()) {
        for bind in binds {
            let range = bind
                .range
                .map(|r| format!(" msb:{} lsb:{}", r.msb, r.lsb))
                .unwrap_or_default();
            output.push_str(&format!(
                "(Bind dest:{}{} tree:{})\n",
                name,
                range,
                design.arena.display(bind.tree)
            ));
        }
    }
    output
}

pub fn format_dataflow(design: &Design) -> String {
    let mut output = format_terms(design);
    output.push_str(&format_binds(design));
    output
}

pub fn format_dependencies(maps: &DependencyMaps) -> String {
    let mut output = String::new();
    output.push_str("Drivers:\n");
    for (target, terminals) in maps.drivers_of() {
        output.push_str(&format!("{}: {{{}}}\n", target, terminals.iter().join(", ")));
    }
    output.push_str("Readers:\n");
    for (terminal, readers) in maps.referenced_by() {
        output.push_str(&format!("{} -> {{{}}}\n", terminal, readers.iter().join(", ")));
    }
    output
}

pub fn format_report(report: &AnalysisReport) -> String {
    let mut output = format_dependencies(&report.maps);
    if !report.skipped.is_empty() {
        output.push_str(&format!("Skipped: {}\n", report.skipped.iter().join(", ")));
    }
    for failure in &report.failures {
        output.push_str(&format!("Failed: {}: {}\n", failure.signal, failure.error));
    }
    output
}

fn format_loop_list<'a>(title: &str, loops: impl IntoIterator<Item = &'a RegisterLoop>) -> String {
    let mut output = String::new();
    output.push_str(title);
    output.push_str(":\n");
    for l in loops {
        let marker = if l.self_loop { " (self)" } else { "" };
        output.push_str(&format!("{}{}\n", l.members.iter().join(" -> "), marker));
    }
    output
}

pub fn format_loops(loops: &[RegisterLoop]) -> String {
    format_loop_list("Loop", loops)
}

pub fn format_fsm_candidates(candidates: &[&RegisterLoop]) -> String {
    format_loop_list("FSM candidates", candidates.iter().copied())
}

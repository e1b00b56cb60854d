// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Formatting module graphs and errors.

use std::path::PathBuf;

use ahash::AHashSet;
use console::style;
use modlink_vm::ecmascript::{
    execution::{Agent, agent::JsError},
    scripts_and_modules::module::module_semantics::abstract_module_records::AbstractModule,
};
use oxc_diagnostics::OxcDiagnostic;

/// Returns the file path a module was loaded from.
pub fn module_path(agent: &Agent, module: AbstractModule) -> Option<PathBuf> {
    let host_defined = module.host_defined(agent)?;
    (*host_defined).downcast_ref::<PathBuf>().cloned()
}

pub fn print_error(agent: &Agent, error: &JsError) {
    eprintln!(
        "{} {}",
        style("Uncaught exception:").red().bold(),
        error.to_string(agent)
    );
}

/// Prints the module graph below `root` as an indented tree. Modules that
/// were already printed are marked instead of being expanded again.
pub fn print_graph(agent: &Agent, root: AbstractModule) {
    let mut seen = AHashSet::default();
    print_graph_node(agent, root, 0, &mut seen);
}

fn print_graph_node(
    agent: &Agent,
    module: AbstractModule,
    depth: usize,
    seen: &mut AHashSet<AbstractModule>,
) {
    let indent = "  ".repeat(depth);
    let name = module_path(agent, module)
        .map_or_else(|| format!("{module:?}"), |path| path.display().to_string());
    if !seen.insert(module) {
        println!("{indent}{} {}", name, style("(seen)").dim());
        return;
    }
    let AbstractModule::SourceTextModule(m) = module else {
        println!("{indent}{} {}", name, style("[synthetic]").cyan());
        return;
    };
    let mut details = format!("{:?}", m.status(agent));
    if m.has_tla(agent) {
        details.push_str(", top-level await");
    }
    if let Some(cycle_root) = m.cycle_root(agent).filter(|cycle_root| *cycle_root != m) {
        let root_name = module_path(agent, cycle_root.into())
            .map_or_else(|| format!("{cycle_root:?}"), |path| path.display().to_string());
        details.push_str(&format!(", cycle root {root_name}"));
    }
    println!("{indent}{} {}", style(name).bold(), style(format!("[{details}]")).dim());
    if let Some(error) = m.evaluation_error(agent) {
        println!("{indent}  {} {}", style("error:").red(), error.to_string(agent));
    }
    let loaded = m
        .loaded_modules(agent)
        .map(|(_, module)| module)
        .collect::<Vec<_>>();
    for dependency in loaded {
        print_graph_node(agent, dependency, depth + 1, seen);
    }
}

/// Prints parse errors as graphical reports.
pub fn report_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &str, source: &str) {
    // This seems to be needed for color and Unicode output.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(oxc_diagnostics::GraphicalReportHandler::new())
    }));

    let named_source = miette::NamedSource::new(source_path, source.to_string());

    eprintln!("{}", style("SyntaxError:").red().bold());

    for error in errors {
        let report = error.with_source_code(named_source.clone());
        eprintln!("{report:?}");
    }
}

/// Exit the program with parse errors.
pub fn exit_with_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &str, source: &str) -> ! {
    assert!(!errors.is_empty());
    report_parse_errors(errors, source_path, source);
    std::process::exit(1);
}

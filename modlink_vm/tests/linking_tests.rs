// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::TestGraph;
use modlink_vm::ecmascript::{
    scripts_and_modules::module::module_semantics::{
        ResolveExportResult, ResolvedBinding, ResolvedBindingName,
        cyclic_module_records::CyclicModuleRecordStatus,
    },
    types::Value,
};

fn sorted(names: Vec<std::rc::Rc<str>>) -> Vec<String> {
    let mut names = names
        .into_iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn imports_read_the_bindings_of_their_exporters() {
    let mut graph = TestGraph::new(&[
        (
            "main",
            "import { x } from 'a'; import { y as z } from 'b'; import { w } from 'b';",
        ),
        ("a", "export let x;"),
        ("b", "const y = 1; export { y }; export { x as w } from 'a';"),
    ]);
    graph.load_and_link("main");
    use CyclicModuleRecordStatus::Linked;
    assert_eq!(
        graph.statuses(&["main", "a", "b"]),
        vec![Linked, Linked, Linked]
    );
    // Nothing has run yet.
    assert_eq!(
        graph.binding("main", "x").unwrap_err().to_string(&graph.agent),
        "ReferenceError: Cannot access 'x' before initialization."
    );

    let promise = graph.evaluate("main");
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.binding("main", "x"), Ok(Value::from_str("a.x")));
    assert_eq!(graph.binding("main", "z"), Ok(Value::from_str("b.y")));
    assert_eq!(graph.binding("main", "w"), Ok(Value::from_str("a.x")));
}

#[test]
fn cycles_link_together() {
    let mut graph = TestGraph::new(&[
        ("a", "import { b } from 'b'; export const a = 1;"),
        ("b", "import { a } from 'a'; export const b = 1;"),
    ]);
    let linked = graph.load_and_link("a");
    assert_eq!(
        graph.statuses(&["a", "b"]),
        vec![
            CyclicModuleRecordStatus::Linked,
            CyclicModuleRecordStatus::Linked
        ]
    );
    // Linking again is a no-op.
    assert_eq!(graph.link("a"), Ok(linked));
}

#[test]
fn missing_exports_fail_to_link() {
    let mut graph = TestGraph::new(&[
        ("main", "import { missing } from 'a';"),
        ("a", "export const present = 1;"),
    ]);
    graph.load("main").unwrap();
    let error = graph.link("main").unwrap_err();
    assert_eq!(
        error.to_string(&graph.agent),
        "SyntaxError: The requested module 'a' does not provide an export named 'missing'"
    );
    assert_eq!(
        graph.statuses(&["main", "a"]),
        vec![
            CyclicModuleRecordStatus::Unlinked,
            CyclicModuleRecordStatus::Linked
        ]
    );
}

#[test]
fn link_failures_only_unlink_the_failing_component() {
    let mut graph = TestGraph::new(&[
        ("a", "import 'b'; import 'e';"),
        ("b", "import 'c';"),
        ("c", "import 'b';"),
        ("e", "import 'a'; import { missing } from 'd';"),
        ("d", "export const present = 1;"),
    ]);
    graph.load("a").unwrap();
    let error = graph.link("a").unwrap_err();
    assert_eq!(
        error.to_string(&graph.agent),
        "SyntaxError: The requested module 'd' does not provide an export named 'missing'"
    );
    use CyclicModuleRecordStatus::{Linked, Unlinked};
    assert_eq!(
        graph.statuses(&["a", "b", "c", "d", "e"]),
        vec![Unlinked, Linked, Linked, Linked, Unlinked]
    );

    // The rolled back component can be linked again.
    let retry = graph.link("a").unwrap_err();
    assert_eq!(retry.to_string(&graph.agent), error.to_string(&graph.agent));
    assert_eq!(graph.status("e"), Unlinked);
}

#[test]
fn conflicting_star_exports_are_ambiguous() {
    let mut graph = TestGraph::new(&[
        ("main", "import { dup } from 'a';"),
        ("a", "export * from 'b'; export * from 'c';"),
        ("b", "export const dup = 1;"),
        ("c", "export const dup = 2;"),
    ]);
    graph.load("main").unwrap();
    let a = graph.abstract_module("a");
    assert_eq!(
        a.resolve_export(&graph.agent, "dup"),
        ResolveExportResult::Ambiguous
    );

    let error = graph.link("main").unwrap_err();
    assert_eq!(
        error.to_string(&graph.agent),
        "SyntaxError: The requested module 'a' contains conflicting star exports for name 'dup'"
    );
    assert_eq!(graph.status("a"), CyclicModuleRecordStatus::Linked);
    assert_eq!(graph.status("main"), CyclicModuleRecordStatus::Unlinked);
}

#[test]
fn ambiguous_names_are_left_out_of_namespaces() {
    let mut graph = TestGraph::new(&[
        ("main", "import * as ns from 'a';"),
        ("a", "export * from 'b'; export * from 'c'; export const own = 1;"),
        ("b", "export const dup = 1;"),
        ("c", "export const dup = 2; export const only = 3;"),
    ]);
    graph.load_and_link("main");
    let Ok(Value::Module(namespace)) = graph.binding("main", "ns") else {
        panic!("'ns' should be a module namespace");
    };
    assert_eq!(namespace.module(&graph.agent), graph.abstract_module("a"));
    assert_eq!(
        sorted(namespace.exports(&graph.agent).to_vec()),
        vec!["only", "own"]
    );
}

#[test]
fn one_binding_reached_through_two_star_exports_is_not_ambiguous() {
    let mut graph = TestGraph::new(&[
        ("main", "import { shared } from 'a';"),
        ("a", "export * from 'b'; export * from 'c';"),
        ("b", "export const shared = 1;"),
        ("c", "export * from 'b';"),
    ]);
    graph.load_and_link("main");
    let a = graph.abstract_module("a");
    let b = graph.abstract_module("b");
    assert_eq!(
        a.resolve_export(&graph.agent, "shared"),
        ResolveExportResult::Resolved(ResolvedBinding {
            module: b,
            binding_name: ResolvedBindingName::String("shared".into()),
        })
    );
}

#[test]
fn star_exports_skip_default() {
    let mut graph = TestGraph::new(&[
        ("a", "export * from 'b'; export const own = 1;"),
        ("b", "export default 1; export const n = 2; export * from 'a';"),
    ]);
    graph.load("a").unwrap();
    let a = graph.abstract_module("a");
    let b = graph.abstract_module("b");
    assert_eq!(sorted(a.get_exported_names(&graph.agent)), vec!["n", "own"]);
    assert_eq!(
        sorted(b.get_exported_names(&graph.agent)),
        vec!["default", "n", "own"]
    );
    assert_eq!(
        a.resolve_export(&graph.agent, "default"),
        ResolveExportResult::Null
    );
}

#[test]
fn namespace_re_exports_resolve_to_the_namespace() {
    let mut graph = TestGraph::new(&[
        ("main", "import { all } from 'b';"),
        ("b", "export * as all from 'a';"),
        ("a", "export const v = 1;"),
    ]);
    graph.load_and_link("main");
    let b = graph.abstract_module("b");
    let a = graph.abstract_module("a");
    assert_eq!(
        b.resolve_export(&graph.agent, "all"),
        ResolveExportResult::Resolved(ResolvedBinding {
            module: a,
            binding_name: ResolvedBindingName::Namespace,
        })
    );
    let promise = graph.evaluate("main");
    assert!(graph.settled(promise).is_ok());
    let Ok(Value::Module(namespace)) = graph.binding("main", "all") else {
        panic!("'all' should be a module namespace");
    };
    assert_eq!(namespace.get(&mut graph.agent, "v"), Ok(Value::from_str("a.v")));
}

#[test]
fn circular_re_exports_do_not_resolve() {
    let mut graph = TestGraph::new(&[
        ("a", "export { x } from 'b';"),
        ("b", "export { x } from 'a';"),
    ]);
    graph.load("a").unwrap();
    let a = graph.abstract_module("a");
    assert_eq!(a.resolve_export(&graph.agent, "x"), ResolveExportResult::Null);
    let error = graph.link("a").unwrap_err();
    assert!(
        error
            .to_string(&graph.agent)
            .starts_with("SyntaxError: The requested module")
    );
    assert_eq!(
        graph.statuses(&["a", "b"]),
        vec![
            CyclicModuleRecordStatus::Unlinked,
            CyclicModuleRecordStatus::Unlinked
        ]
    );
}

#[test]
fn json_imports_bind_the_source_text() {
    let mut graph = TestGraph::new(&[
        ("main", "import data from 'data' with { type: 'json' };"),
        ("data", "{\"answer\":42}"),
    ]);
    let promise = graph.evaluate("main");
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.fetches(), vec!["data"]);
    assert_eq!(
        graph.binding("main", "data"),
        Ok(Value::from_str("{\"answer\":42}"))
    );
    let data = graph
        .module("main")
        .loaded_modules(&graph.agent)
        .map(|(_, module)| module)
        .next()
        .unwrap();
    assert_eq!(data.status(&graph.agent), None);
    assert_eq!(graph.name_of(data), "data");
}

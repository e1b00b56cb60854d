// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::TestGraph;
use modlink_vm::ecmascript::scripts_and_modules::module::module_semantics::{
    ModuleRequestRecord, cyclic_module_records::CyclicModuleRecordStatus,
};

const DIAMOND: [(&str, &str); 4] = [
    ("main", "import 'a'; import 'b';"),
    ("a", "import 'c';"),
    ("b", "import { c } from 'c'; import 'c';"),
    ("c", "export const c = 1;"),
];

#[test]
fn shared_dependencies_are_fetched_once() {
    let mut graph = TestGraph::new(&DIAMOND);
    graph.load("main").unwrap();

    assert_eq!(graph.fetches(), vec!["a", "c", "b"]);
    // Both requests of 'b' collapse into one.
    let b = graph.module("b");
    assert_eq!(b.requested_modules(&graph.agent).len(), 1);

    let request = ModuleRequestRecord::from_specifier("c");
    let a = graph.module("a");
    let c_from_a = a.get_loaded_module(&graph.agent, &request);
    let c_from_b = b.get_loaded_module(&graph.agent, &request);
    assert!(c_from_a.is_some());
    assert_eq!(c_from_a, c_from_b);

    use CyclicModuleRecordStatus::Unlinked;
    assert_eq!(
        graph.statuses(&["main", "a", "b", "c"]),
        vec![Unlinked, Unlinked, Unlinked, Unlinked]
    );
}

#[test]
fn deferred_loads_produce_the_same_graph() {
    let mut graph = TestGraph::builder()
        .module(DIAMOND[0].0, DIAMOND[0].1)
        .module(DIAMOND[1].0, DIAMOND[1].1)
        .module(DIAMOND[2].0, DIAMOND[2].1)
        .module(DIAMOND[3].0, DIAMOND[3].1)
        .defer_loading()
        .build();
    let promise = graph.start_load("main");
    assert!(promise.is_pending(&graph.agent));
    assert_eq!(graph.pending_load_count(), 2);
    assert_eq!(graph.status("main"), CyclicModuleRecordStatus::New);

    graph.run_jobs();
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.fetches(), vec!["a", "b", "c"]);
    assert_eq!(graph.status("main"), CyclicModuleRecordStatus::Unlinked);

    graph.link("main").unwrap();
    let promise = graph.evaluate("main");
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["c", "a", "b", "main"]);
}

#[test]
fn cyclic_graphs_load() {
    let mut graph = TestGraph::new(&[("a", "import 'b';"), ("b", "import 'a';")]);
    graph.load("a").unwrap();
    assert_eq!(graph.fetches(), vec!["b"]);
    assert_eq!(
        graph.statuses(&["a", "b"]),
        vec![
            CyclicModuleRecordStatus::Unlinked,
            CyclicModuleRecordStatus::Unlinked
        ]
    );
}

#[test]
fn missing_modules_reject_loading() {
    let mut graph = TestGraph::new(&[
        ("main", "import 'a'; import 'missing';"),
        ("a", "export const a = 1;"),
    ]);
    let promise = graph.start_load("main");
    graph.run_jobs();
    assert_eq!(
        graph.rejection_message(promise),
        "TypeError: Cannot find module 'missing'"
    );
    // Nothing visited by a failed load becomes unlinked.
    assert_eq!(
        graph.statuses(&["main", "a"]),
        vec![CyclicModuleRecordStatus::New, CyclicModuleRecordStatus::New]
    );
}

#[test]
fn unsupported_import_attributes_reject_loading() {
    let mut graph = TestGraph::new(&[
        ("main", "import styles from 'styles' with { kind: 'css' };"),
        ("styles", ""),
    ]);
    let promise = graph.start_load("main");
    graph.run_jobs();
    assert_eq!(
        graph.rejection_message(promise),
        "SyntaxError: Unsupported import attribute in import of 'styles'."
    );
    assert!(graph.fetches().is_empty());
    assert_eq!(graph.status("main"), CyclicModuleRecordStatus::New);
}

#[test]
fn answers_after_a_failed_load_are_ignored() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'missing'; import 'a';")
        .module("a", "import 'b';")
        .module("b", "")
        .defer_loading()
        .build();
    let promise = graph.start_load("main");
    assert_eq!(graph.pending_load_count(), 2);

    assert!(graph.answer_next_load());
    assert_eq!(
        graph.rejection_message(promise),
        "TypeError: Cannot find module 'missing'"
    );

    // The host still answers the request for 'a'.
    assert!(graph.answer_next_load());
    graph.run_jobs();
    let main = graph.module("main");
    assert_eq!(
        main.get_loaded_module(&graph.agent, &ModuleRequestRecord::from_specifier("a")),
        None
    );
    assert_eq!(graph.fetches(), vec!["missing", "a"]);
    assert_eq!(graph.status("a"), CyclicModuleRecordStatus::New);
}

#[test]
fn loading_a_loaded_graph_again_succeeds() {
    let mut graph = TestGraph::new(&DIAMOND);
    graph.load("main").unwrap();
    graph.load("main").unwrap();
    assert_eq!(graph.fetches(), vec!["a", "c", "b"]);
}

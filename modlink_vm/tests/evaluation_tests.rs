// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::TestGraph;
use modlink_vm::ecmascript::{
    execution::agent::PromiseRejectionTrackerOperation,
    scripts_and_modules::module::module_semantics::cyclic_module_records::CyclicModuleRecordStatus,
};

use CyclicModuleRecordStatus::{Evaluated, EvaluatingAsync};

#[test]
fn a_single_dependency_evaluates_first() {
    let mut graph = TestGraph::new(&[("a", "import 'b';"), ("b", "export const b = 1;")]);
    let promise = graph.evaluate("a");
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["b", "a"]);
    assert_eq!(graph.statuses(&["a", "b"]), vec![Evaluated, Evaluated]);

    let a = graph.module("a");
    let b = graph.module("b");
    assert_eq!(a.cycle_root(&graph.agent), Some(a));
    assert_eq!(b.cycle_root(&graph.agent), Some(b));
}

#[test]
fn dependencies_run_in_post_order() {
    let mut graph = TestGraph::new(&[
        ("main", "import 'a'; import 'b';"),
        ("a", "import 'c';"),
        ("b", "import 'c'; import 'd';"),
        ("c", "import 'd';"),
        ("d", ""),
    ]);
    let promise = graph.evaluate("main");
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["d", "c", "a", "b", "main"]);
}

#[test]
fn cycles_share_a_root_and_a_promise() {
    let mut graph = TestGraph::new(&[
        ("a", "import 'b'; export const a = 1;"),
        ("b", "import 'a'; export const b = 1;"),
    ]);
    let promise = graph.evaluate("a");
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["b", "a"]);

    let a = graph.module("a");
    let b = graph.module("b");
    assert_eq!(a.cycle_root(&graph.agent), Some(a));
    assert_eq!(b.cycle_root(&graph.agent), Some(a));

    // Evaluating any member of the cycle observes the root's promise.
    let b = graph.link("b").unwrap();
    assert_eq!(b.evaluate(&mut graph.agent), promise);
    assert_eq!(graph.log(), vec!["b", "a"]);
}

#[test]
fn evaluating_twice_returns_the_same_promise() {
    let mut graph = TestGraph::new(&[("main", "import 'a';"), ("a", "")]);
    let linked = graph.load_and_link("main");
    let first = linked.evaluate(&mut graph.agent);
    graph.run_jobs();
    let second = linked.evaluate(&mut graph.agent);
    assert_eq!(first, second);
    assert_eq!(graph.log(), vec!["a", "main"]);
}

#[test]
fn synchronous_throws_fail_the_whole_stack() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'a'; import 'c';")
        .module("a", "import 'b';")
        .module("b", "")
        .module("c", "")
        .throwing("b")
        .build();
    let promise = graph.evaluate("main");
    assert_eq!(graph.rejection_message(promise), "Error: b threw");
    // 'c' is never reached.
    assert_eq!(graph.log(), vec!["b"]);
    assert_eq!(
        graph.statuses(&["main", "a", "b"]),
        vec![Evaluated, Evaluated, Evaluated]
    );
    assert_eq!(graph.status("c"), CyclicModuleRecordStatus::Linked);

    let error = graph.module("b").evaluation_error(&graph.agent);
    assert!(error.is_some());
    assert_eq!(graph.module("a").evaluation_error(&graph.agent), error);
    assert_eq!(graph.module("main").evaluation_error(&graph.agent), error);

    // Re-evaluating reports the stored error without running anything.
    let linked = graph.link("main").unwrap();
    assert_eq!(linked.evaluate(&mut graph.agent), promise);
    assert_eq!(graph.log(), vec!["b"]);
}

#[test]
fn importers_of_a_failed_module_fail_with_its_error() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'a';")
        .module("a", "")
        .module("late", "import 'a';")
        .throwing("a")
        .build();
    let promise = graph.evaluate("main");
    assert_eq!(graph.rejection_message(promise), "Error: a threw");

    let promise = graph.evaluate("late");
    assert_eq!(graph.rejection_message(promise), "Error: a threw");
    assert_eq!(graph.log(), vec!["a"]);
}

#[test]
fn importers_wait_for_top_level_await() {
    let mut graph = TestGraph::builder()
        .module("a", "import 'b';")
        .module("b", "await 0;")
        .gated("b")
        .build();
    let promise = graph.evaluate("a");
    assert!(promise.is_pending(&graph.agent));
    assert!(graph.log().is_empty());
    assert_eq!(
        graph.statuses(&["a", "b"]),
        vec![EvaluatingAsync, EvaluatingAsync]
    );
    assert!(!graph.module("a").has_tla(&graph.agent));

    graph.open_gate("b");
    graph.run_jobs();
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["b", "a"]);
    assert_eq!(graph.statuses(&["a", "b"]), vec![Evaluated, Evaluated]);
}

#[test]
fn top_level_await_without_a_gate_settles_in_the_job_loop() {
    let mut graph = TestGraph::new(&[("main", "import 'slow';"), ("slow", "await 0;")]);
    let promise = graph.start_evaluate("main");
    assert!(promise.is_pending(&graph.agent));
    graph.run_jobs();
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["slow", "main"]);
}

#[test]
fn dependents_run_after_their_last_async_dependency() {
    let mut graph = TestGraph::builder()
        .module("c", "import 'b'; import 'a';")
        .module("a", "await 0;")
        .module("b", "await 0;")
        .gated("a")
        .gated("b")
        .build();
    let promise = graph.evaluate("c");

    graph.open_gate("a");
    graph.run_jobs();
    assert_eq!(graph.log(), vec!["a"]);
    assert!(promise.is_pending(&graph.agent));

    graph.open_gate("b");
    graph.run_jobs();
    assert_eq!(graph.log(), vec!["a", "b", "c"]);
    assert!(graph.settled(promise).is_ok());
}

#[test]
fn ready_dependents_run_in_evaluation_order() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'q'; import 'p';")
        .module("p", "import 'x';")
        .module("q", "import 'x';")
        .module("x", "await 0;")
        .gated("x")
        .build();
    let promise = graph.evaluate("main");
    graph.open_gate("x");
    graph.run_jobs();
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["x", "q", "p", "main"]);
}

#[test]
fn later_roots_wait_for_pending_dependencies() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'shared';")
        .module("other", "import 'shared';")
        .module("shared", "await 0;")
        .gated("shared")
        .build();
    let first = graph.evaluate("main");
    let second = graph.evaluate("other");
    assert_ne!(first, second);
    assert!(second.is_pending(&graph.agent));

    graph.open_gate("shared");
    graph.run_jobs();
    assert!(graph.settled(first).is_ok());
    assert!(graph.settled(second).is_ok());
    assert_eq!(graph.log(), vec!["shared", "main", "other"]);
}

#[test]
fn async_failures_reject_every_dependent_once() {
    let mut graph = TestGraph::builder()
        .module("root", "import 'a'; import 'b';")
        .module("a", "import 's';")
        .module("b", "import 's';")
        .module("s", "await 0;")
        .gated("s")
        .build();
    let promise = graph.evaluate("root");
    graph.fail_gate("s");
    graph.run_jobs();

    assert_eq!(graph.rejection_message(promise), "Error: s failed");
    assert_eq!(
        graph.rejections_of(promise),
        vec![PromiseRejectionTrackerOperation::Reject]
    );
    // Only the failing body resumed.
    assert_eq!(graph.log(), vec!["s"]);
    assert_eq!(
        graph.statuses(&["root", "a", "b", "s"]),
        vec![Evaluated, Evaluated, Evaluated, Evaluated]
    );
    let error = graph.module("s").evaluation_error(&graph.agent);
    for name in ["root", "a", "b"] {
        assert_eq!(graph.module(name).evaluation_error(&graph.agent), error);
    }
}

#[test]
fn async_roots_settle_after_their_own_body() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'dep'; await 0;")
        .module("dep", "")
        .gated("main")
        .build();
    let promise = graph.evaluate("main");
    assert_eq!(graph.log(), vec!["dep"]);
    assert!(promise.is_pending(&graph.agent));
    assert_eq!(graph.status("main"), EvaluatingAsync);
    assert_eq!(graph.status("dep"), Evaluated);

    graph.open_gate("main");
    graph.run_jobs();
    assert!(graph.settled(promise).is_ok());
    assert_eq!(graph.log(), vec!["dep", "main"]);
}

#[test]
fn synchronous_throws_fail_a_cycle_with_a_suspended_member() {
    let mut graph = TestGraph::builder()
        .module("a", "import 'b'; import 'c';")
        .module("b", "import 'a'; await 0;")
        .module("c", "")
        .throwing("c")
        .gated("b")
        .build();
    let promise = graph.evaluate("a");
    assert_eq!(graph.rejection_message(promise), "Error: c threw");
    assert_eq!(graph.log(), vec!["c"]);
    assert_eq!(
        graph.statuses(&["a", "b", "c"]),
        vec![Evaluated, Evaluated, Evaluated]
    );
    // 'b' had already started its body when 'c' threw.
    let error = graph.module("a").evaluation_error(&graph.agent);
    assert!(error.is_some());
    assert_eq!(graph.module("b").evaluation_error(&graph.agent), error);

    // Finishing the suspended body changes nothing.
    graph.open_gate("b");
    graph.run_jobs();
    assert_eq!(graph.log(), vec!["c", "b"]);
    assert_eq!(
        graph.statuses(&["a", "b", "c"]),
        vec![Evaluated, Evaluated, Evaluated]
    );
    assert_eq!(graph.module("b").evaluation_error(&graph.agent), error);
    assert_eq!(graph.rejection_message(promise), "Error: c threw");
    assert_eq!(
        graph.rejections_of(promise),
        vec![PromiseRejectionTrackerOperation::Reject]
    );
}

#[test]
fn cycles_with_top_level_await_settle_together() {
    let mut graph = TestGraph::builder()
        .module("main", "import 'a';")
        .module("a", "import 'b';")
        .module("b", "import 'a'; await 0;")
        .gated("b")
        .build();
    let promise = graph.evaluate("main");
    assert!(promise.is_pending(&graph.agent));
    assert!(graph.log().is_empty());
    assert_eq!(
        graph.statuses(&["main", "a", "b"]),
        vec![EvaluatingAsync, EvaluatingAsync, EvaluatingAsync]
    );

    let a = graph.module("a");
    let b = graph.module("b");
    assert_eq!(a.cycle_root(&graph.agent), Some(a));
    assert_eq!(b.cycle_root(&graph.agent), Some(a));

    // Both members of the cycle observe the same pending promise.
    let from_a = graph.link("a").unwrap().evaluate(&mut graph.agent);
    let from_b = graph.link("b").unwrap().evaluate(&mut graph.agent);
    assert_eq!(from_a, from_b);
    assert_ne!(from_a, promise);
    assert!(from_a.is_pending(&graph.agent));

    graph.open_gate("b");
    graph.run_jobs();
    assert_eq!(graph.log(), vec!["b", "a", "main"]);
    assert!(graph.settled(from_a).is_ok());
    assert!(graph.settled(promise).is_ok());
    assert_eq!(
        graph.statuses(&["main", "a", "b"]),
        vec![Evaluated, Evaluated, Evaluated]
    );
}

#[test]
fn synchronous_parents_of_async_modules_can_throw() {
    let mut graph = TestGraph::builder()
        .module("root", "import 'p';")
        .module("p", "import 's';")
        .module("s", "await 0;")
        .gated("s")
        .throwing("p")
        .build();
    let promise = graph.evaluate("root");
    assert!(promise.is_pending(&graph.agent));

    graph.open_gate("s");
    graph.run_jobs();
    assert_eq!(graph.rejection_message(promise), "Error: p threw");
    assert_eq!(graph.log(), vec!["s", "p"]);
    assert_eq!(
        graph.statuses(&["root", "p", "s"]),
        vec![Evaluated, Evaluated, Evaluated]
    );
    assert!(graph.module("s").evaluation_error(&graph.agent).is_none());
    let error = graph.module("p").evaluation_error(&graph.agent);
    assert!(error.is_some());
    assert_eq!(graph.module("root").evaluation_error(&graph.agent), error);
}

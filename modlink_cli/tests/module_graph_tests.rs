// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{fs, path::PathBuf};

use modlink_cli::{EntryError, Instance, InstanceConfig, module_path, resolve_specifier};
use modlink_vm::ecmascript::{
    builtins::Module,
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::AbstractModule,
        cyclic_module_records::CyclicModuleRecordStatus, get_module_namespace,
    },
    types::Value,
};
use tempfile::TempDir;

fn write_graph(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Should have been able to create a temporary directory");
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).expect("Should have been able to write file");
    }
    dir
}

fn canonical(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name).canonicalize().unwrap()
}

fn file_names(paths: Vec<PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn dependencies_evaluate_before_dependents() {
    let dir = write_graph(&[
        ("main.js", "import './a.js'; import './b.js';"),
        ("a.js", "import './c.js';"),
        ("b.js", "import './c.js';"),
        ("c.js", "export const c = 1;"),
    ]);
    for defer_loading in [false, true] {
        let mut instance = Instance::new(InstanceConfig {
            verbose: false,
            defer_loading,
        });
        let main = instance.load_entry(&dir.path().join("main.js")).unwrap();
        instance.run_module(main).unwrap();
        assert_eq!(
            file_names(instance.take_evaluation_log()),
            vec!["c.js", "a.js", "b.js", "main.js"]
        );
        assert_eq!(
            main.status(instance.agent()),
            CyclicModuleRecordStatus::Evaluated
        );
        // Every file was loaded exactly once.
        assert_eq!(instance.host_hooks().module_map().len(), 4);
    }
}

#[test]
fn cycles_share_a_cycle_root() {
    let dir = write_graph(&[
        ("a.js", "import { b } from './b.js'; export const a = 'a';"),
        ("b.js", "import { a } from './a.js'; export const b = 'b';"),
    ]);
    let mut instance = Instance::new(InstanceConfig::default());
    let a = instance.load_entry(&dir.path().join("a.js")).unwrap();
    instance.run_module(a).unwrap();
    assert_eq!(
        file_names(instance.take_evaluation_log()),
        vec!["b.js", "a.js"]
    );
    let agent = instance.agent();
    let (_, b) = a.loaded_modules(agent).next().unwrap();
    assert_eq!(b.cycle_root(agent), Some(a));
    assert_eq!(a.cycle_root(agent), Some(a));
    assert_eq!(module_path(agent, b), Some(canonical(&dir, "b.js")));
}

#[test]
fn top_level_await_completes_through_the_event_loop() {
    let dir = write_graph(&[
        ("main.js", "import { value } from './slow.js';"),
        ("slow.js", "export const value = await Promise.resolve(1);"),
    ]);
    let mut instance = Instance::new(InstanceConfig::default());
    let main = instance.load_entry(&dir.path().join("main.js")).unwrap();
    assert!(!main.has_tla(instance.agent()));
    instance.run_module(main).unwrap();
    assert_eq!(
        file_names(instance.take_evaluation_log()),
        vec!["slow.js", "main.js"]
    );
    assert_eq!(
        main.status(instance.agent()),
        CyclicModuleRecordStatus::Evaluated
    );
}

#[test]
fn json_modules_export_their_source_as_default() {
    let dir = write_graph(&[
        (
            "main.js",
            "import data from './data.json' with { type: 'json' }; export { data };",
        ),
        ("data.json", "{\"answer\":42}"),
    ]);
    let mut instance = Instance::new(InstanceConfig::default());
    let main = instance.load_entry(&dir.path().join("main.js")).unwrap();
    instance.run_module(main).unwrap();
    let agent = instance.agent_mut();
    let namespace: Module = get_module_namespace(agent, AbstractModule::from(main));
    assert_eq!(
        namespace.get(agent, "data"),
        Ok(Value::from_str("{\"answer\":42}"))
    );
}

#[test]
fn dependency_parse_errors_reject_loading() {
    let dir = write_graph(&[
        ("main.js", "import './broken.js';"),
        ("broken.js", "export const = 1;"),
    ]);
    let mut instance = Instance::new(InstanceConfig::default());
    let main = instance.load_entry(&dir.path().join("main.js")).unwrap();
    let error = instance.load_graph(main).unwrap_err();
    assert!(
        error
            .to_string(instance.agent())
            .starts_with("SyntaxError: Failed to parse module './broken.js'")
    );
    assert_eq!(main.status(instance.agent()), CyclicModuleRecordStatus::New);
}

#[test]
fn entry_parse_errors_are_returned() {
    let dir = write_graph(&[("main.js", "import { from './a.js';")]);
    let mut instance = Instance::new(InstanceConfig::default());
    let Err(EntryError::Parse { errors, .. }) = instance.load_entry(&dir.path().join("main.js"))
    else {
        panic!("expected parse errors");
    };
    assert!(!errors.is_empty());
}

#[test]
fn missing_imports_fail_to_link() {
    let dir = write_graph(&[
        ("main.js", "import { missing } from './a.js';"),
        ("a.js", "export const present = 1;"),
    ]);
    let mut instance = Instance::new(InstanceConfig::default());
    let main = instance.load_entry(&dir.path().join("main.js")).unwrap();
    instance.load_graph(main).unwrap();
    let error = instance.link(main).unwrap_err();
    assert_eq!(
        error.to_string(instance.agent()),
        "SyntaxError: The requested module './a.js' does not provide an export named 'missing'"
    );
    assert_eq!(
        main.status(instance.agent()),
        CyclicModuleRecordStatus::Unlinked
    );
}

#[test]
fn specifiers_resolve_relative_to_the_referrer() {
    let dir = write_graph(&[("a.js", ""), ("b.js", "")]);
    let a = canonical(&dir, "a.js");
    assert_eq!(
        resolve_specifier(Some(&a), "./b.js"),
        Ok(canonical(&dir, "b.js"))
    );
    assert!(resolve_specifier(Some(&a), "lodash").is_err());
    assert!(resolve_specifier(Some(&a), "./missing.js").is_err());
    assert!(resolve_specifier(None, "./b.js").is_err());
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

use ahash::AHashMap;
use modlink_vm::ecmascript::scripts_and_modules::module::module_semantics::abstract_module_records::AbstractModule;

/// How the contents of a file are turned into a Module Record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    JavaScript,
    /// Imported `with { type: "json" }`: a synthetic module whose default
    /// export is the file contents.
    Json,
}

/// Every module loaded by the CLI, keyed by canonical path. Each file is
/// read and parsed at most once per kind.
#[derive(Debug, Default)]
pub struct ModuleMap {
    map: RefCell<AHashMap<(PathBuf, ModuleKind), AbstractModule>>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(&self, path: PathBuf, kind: ModuleKind, module: AbstractModule) {
        let previous = self.map.borrow_mut().insert((path, kind), module);
        debug_assert!(previous.is_none());
    }

    pub fn get(&self, path: &Path, kind: ModuleKind) -> Option<AbstractModule> {
        self.map
            .borrow()
            .get(&(path.to_path_buf(), kind))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

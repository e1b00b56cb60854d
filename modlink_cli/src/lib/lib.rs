// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Utilities for the modlink cli program.
//!
//! > [!IMPORTANT]
//! > This library is currently mainly aimed at internal use and might not
//! > adhere to semver versioning.

mod fmt;
mod host_hooks;
mod module_body;
mod module_map;

pub use fmt::{exit_with_parse_errors, module_path, print_error, print_graph, report_parse_errors};
pub use host_hooks::{CliHostHooks, PendingLoad, resolve_specifier};
pub use module_map::{ModuleKind, ModuleMap};

use std::path::{Path, PathBuf};

use modlink_vm::ecmascript::{
    builtins::Promise,
    execution::{
        Agent, JsResult, Options,
        agent::ExceptionType,
    },
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::{AbstractModule, LinkedModule},
        source_text_module_records::SourceTextModule,
    },
    types::Value,
};
use oxc_diagnostics::OxcDiagnostic;

/// Runs queued promise jobs and answers deferred module loads until both
/// queues are empty.
pub fn run_event_loop(agent: &mut Agent, host_hooks: &CliHostHooks) -> JsResult<()> {
    loop {
        while let Some(job) = host_hooks.pop_promise_job() {
            job.run(agent)?;
        }
        let Some(load) = host_hooks.pop_pending_load() else {
            return Ok(());
        };
        host_hooks.finish_load(agent, load);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InstanceConfig {
    /// Whether to print loader, linker and evaluator internals. Default
    /// `false`.
    pub verbose: bool,
    /// Whether module loads are answered from the event loop instead of
    /// synchronously. Default `false`.
    pub defer_loading: bool,
}

/// Failure to read or parse an entry module.
#[derive(Debug)]
pub enum EntryError {
    Io(PathBuf, std::io::Error),
    Parse {
        path: PathBuf,
        source_text: String,
        errors: Vec<OxcDiagnostic>,
    },
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryError::Io(path, err) => write!(f, "Cannot read '{}': {err}", path.display()),
            EntryError::Parse { path, errors, .. } => write!(
                f,
                "Failed to parse '{}': {} errors",
                path.display(),
                errors.len()
            ),
        }
    }
}

impl std::error::Error for EntryError {}

pub struct Instance {
    agent: Agent,
    host_hooks: &'static CliHostHooks,
}

impl Instance {
    pub fn new(config: InstanceConfig) -> Self {
        let host_hooks: &CliHostHooks = &*Box::leak(Box::new(CliHostHooks::new(
            config.defer_loading,
        )));
        let agent = Agent::new(
            Options {
                print_internals: config.verbose,
            },
            host_hooks,
        );
        Self { agent, host_hooks }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn host_hooks(&self) -> &CliHostHooks {
        self.host_hooks
    }

    /// Reads and parses the entry module of a graph. An entry that was
    /// already loaded, for example as a dependency of an earlier entry, is
    /// reused.
    pub fn load_entry(&mut self, path: &Path) -> Result<SourceTextModule, EntryError> {
        let path = path
            .canonicalize()
            .map_err(|err| EntryError::Io(path.to_path_buf(), err))?;
        if let Some(AbstractModule::SourceTextModule(module)) = self
            .host_hooks
            .module_map()
            .get(&path, ModuleKind::JavaScript)
        {
            return Ok(module);
        }
        let source_text =
            std::fs::read_to_string(&path).map_err(|err| EntryError::Io(path.clone(), err))?;
        self.host_hooks
            .parse_file(&mut self.agent, path.clone(), &source_text)
            .map_err(|errors| EntryError::Parse {
                path,
                source_text,
                errors,
            })
    }

    /// Loads every module in the graph of `module`.
    pub fn load_graph(&mut self, module: SourceTextModule) -> JsResult<()> {
        let promise = AbstractModule::from(module).load_requested_modules(&mut self.agent, None);
        self.settle(promise, "Module graph loading did not finish.")
            .map(|_| ())
    }

    pub fn link(&mut self, module: SourceTextModule) -> JsResult<LinkedModule> {
        AbstractModule::from(module).link(&mut self.agent)
    }

    /// Evaluates a linked module and runs the event loop until its
    /// evaluation promise settles.
    pub fn evaluate(&mut self, module: LinkedModule) -> JsResult<()> {
        let promise = module.evaluate(&mut self.agent);
        self.settle(promise, "Module evaluation did not finish.")
            .map(|_| ())
    }

    /// Loads, links and evaluates the graph of `module`.
    pub fn run_module(&mut self, module: SourceTextModule) -> JsResult<()> {
        self.load_graph(module)?;
        let linked = self.link(module)?;
        self.evaluate(linked)
    }

    /// Paths of evaluated modules since the last call, in evaluation order.
    pub fn take_evaluation_log(&self) -> Vec<PathBuf> {
        self.host_hooks.take_evaluation_log()
    }

    fn settle(
        &mut self,
        promise: Promise,
        unsettled_message: &'static str,
    ) -> JsResult<Value> {
        run_event_loop(&mut self.agent, self.host_hooks)?;
        match promise.try_get_result(&self.agent) {
            Some(result) => result,
            None => Err(self
                .agent
                .throw_exception_with_static_message(ExceptionType::TypeError, unsettled_message)),
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Debug,
    path::{Path, PathBuf},
    rc::Rc,
};

use modlink_vm::ecmascript::{
    execution::{
        Agent, JsResult,
        agent::{ExceptionType, HostHooks, Job},
    },
    scripts_and_modules::{
        HostDefined,
        module::module_semantics::{
            ModuleRequestRecord,
            abstract_module_records::AbstractModule,
            cyclic_module_records::GraphLoadingState,
            finish_loading_imported_module,
            source_text_module_records::{SourceTextModule, parse_module},
            synthetic_module_records::create_default_export_synthetic_module,
        },
    },
    types::Value,
};

use crate::{
    fmt::report_parse_errors,
    module_body::TracingModuleBody,
    module_map::{ModuleKind, ModuleMap},
};

/// A HostLoadImportedModule call that has not been answered yet.
#[derive(Debug)]
pub struct PendingLoad {
    referrer: SourceTextModule,
    module_request: ModuleRequestRecord,
    payload: GraphLoadingState,
}

pub struct CliHostHooks {
    promise_job_queue: RefCell<VecDeque<Job>>,
    pending_loads: RefCell<VecDeque<PendingLoad>>,
    module_map: ModuleMap,
    evaluation_log: Rc<RefCell<Vec<PathBuf>>>,
    defer_loading: bool,
}

// RefCell doesn't implement Debug
impl Debug for CliHostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliHostHooks")
            .field("module_map", &self.module_map)
            .field("defer_loading", &self.defer_loading)
            .finish()
    }
}

impl CliHostHooks {
    /// With `defer_loading` set, module loads are answered from the event
    /// loop instead of synchronously.
    pub fn new(defer_loading: bool) -> Self {
        Self {
            promise_job_queue: Default::default(),
            pending_loads: Default::default(),
            module_map: ModuleMap::new(),
            evaluation_log: Default::default(),
            defer_loading,
        }
    }

    pub fn has_promise_jobs(&self) -> bool {
        !self.promise_job_queue.borrow().is_empty()
    }

    pub fn pop_promise_job(&self) -> Option<Job> {
        self.promise_job_queue.borrow_mut().pop_front()
    }

    pub fn pop_pending_load(&self) -> Option<PendingLoad> {
        self.pending_loads.borrow_mut().pop_front()
    }

    pub fn module_map(&self) -> &ModuleMap {
        &self.module_map
    }

    /// Paths of the module bodies that ran to completion, in completion
    /// order. Clears the log.
    pub fn take_evaluation_log(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.evaluation_log.borrow_mut())
    }

    /// Answers a pending load.
    pub fn finish_load(&self, agent: &mut Agent, load: PendingLoad) {
        let PendingLoad {
            referrer,
            module_request,
            payload,
        } = load;
        let result = self.load(agent, referrer, &module_request);
        finish_loading_imported_module(agent, referrer, &module_request, payload, result);
    }

    /// Parses a JavaScript module file and registers it in the module map.
    ///
    /// Returns the parse errors together with the source text on failure.
    pub fn parse_file(
        &self,
        agent: &mut Agent,
        path: PathBuf,
        source_text: &str,
    ) -> Result<SourceTextModule, Vec<oxc_diagnostics::OxcDiagnostic>> {
        let host_defined: HostDefined = Rc::new(path.clone());
        let evaluation_log = self.evaluation_log.clone();
        let body_path = path.clone();
        let module = parse_module(agent, source_text, Some(host_defined), move |_| {
            Box::new(TracingModuleBody::new(body_path, evaluation_log))
        })?;
        self.module_map
            .add(path, ModuleKind::JavaScript, module.into());
        Ok(module)
    }

    fn load(
        &self,
        agent: &mut Agent,
        referrer: SourceTextModule,
        module_request: &ModuleRequestRecord,
    ) -> JsResult<AbstractModule> {
        let specifier = module_request.specifier();
        let referrer_path = referrer.host_defined(agent).and_then(|host_defined| {
            (*host_defined).downcast_ref::<PathBuf>().cloned()
        });
        let path = resolve_specifier(referrer_path.as_deref(), specifier)
            .map_err(|message| agent.throw_exception(ExceptionType::TypeError, message))?;
        let kind = match module_request.attribute("type") {
            None => ModuleKind::JavaScript,
            Some("json") => ModuleKind::Json,
            Some(other) => {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    format!("Unsupported module type '{other}' for '{specifier}'"),
                ));
            }
        };
        if let Some(module) = self.module_map.get(&path, kind) {
            return Ok(module);
        }
        if agent.options().print_internals {
            eprintln!("Loading {}", path.display());
        }
        let source_text = std::fs::read_to_string(&path).map_err(|err| {
            agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot read module '{specifier}': {err}"),
            )
        })?;
        match kind {
            ModuleKind::Json => {
                let host_defined: HostDefined = Rc::new(path.clone());
                let module: AbstractModule = create_default_export_synthetic_module(
                    agent,
                    Value::from_str(&source_text),
                    Some(host_defined),
                )
                .into();
                self.module_map.add(path, kind, module);
                Ok(module)
            }
            ModuleKind::JavaScript => {
                match self.parse_file(agent, path.clone(), &source_text) {
                    Ok(module) => Ok(module.into()),
                    Err(errors) => {
                        report_parse_errors(errors, &path.to_string_lossy(), &source_text);
                        Err(agent.throw_exception(
                            ExceptionType::SyntaxError,
                            format!("Failed to parse module '{specifier}'"),
                        ))
                    }
                }
            }
        }
    }
}

impl HostHooks for CliHostHooks {
    fn enqueue_promise_job(&self, job: Job) {
        self.promise_job_queue.borrow_mut().push_back(job);
    }

    fn load_imported_module(
        &self,
        agent: &mut Agent,
        referrer: SourceTextModule,
        module_request: &ModuleRequestRecord,
        _host_defined: Option<HostDefined>,
        payload: GraphLoadingState,
    ) {
        let load = PendingLoad {
            referrer,
            module_request: module_request.clone(),
            payload,
        };
        if self.defer_loading {
            self.pending_loads.borrow_mut().push_back(load);
        } else {
            self.finish_load(agent, load);
        }
    }
}

/// Resolves a relative or absolute specifier against the referrer's path
/// and canonicalizes the result.
pub fn resolve_specifier(referrer: Option<&Path>, specifier: &str) -> Result<PathBuf, String> {
    let path = if specifier.starts_with("./") || specifier.starts_with("../") {
        let base = referrer
            .and_then(Path::parent)
            .ok_or_else(|| format!("Cannot resolve '{specifier}' without a referrer"))?;
        base.join(specifier)
    } else if Path::new(specifier).is_absolute() {
        PathBuf::from(specifier)
    } else {
        return Err(format!("Cannot resolve bare module specifier '{specifier}'"));
    };
    path.canonicalize()
        .map_err(|_| format!("Cannot find module '{specifier}'"))
}

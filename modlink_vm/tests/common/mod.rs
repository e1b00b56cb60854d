// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory host for module graph tests. Module specifiers are module
//! names; every name maps to a source text. Module bodies do not interpret
//! their source: they record their completion in a shared log, optionally
//! throw, and modules with top-level await suspend exactly once.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Debug,
    rc::Rc,
};

use ahash::{AHashMap, AHashSet};
use modlink_vm::{
    ecmascript::{
        builtins::{
            Promise,
            control_abstraction_objects::promise_objects::promise_abstract_operations::promise_capability_records::PromiseCapability,
        },
        execution::{
            Agent, JsResult, Options,
            agent::{ExceptionType, HostHooks, Job, PromiseRejectionTrackerOperation},
        },
        scripts_and_modules::{
            HostDefined,
            module::module_semantics::{
                ModuleRequestRecord,
                abstract_module_records::{AbstractModule, LinkedModule},
                cyclic_module_records::{CyclicModuleRecordStatus, GraphLoadingState},
                finish_loading_imported_module,
                source_text_module_records::{SourceTextModule, parse_module},
                synthetic_module_records::create_default_export_synthetic_module,
            },
        },
        types::Value,
    },
    engine::{ModuleBody, ModuleBodyStep},
};

/// State shared between the host and the module bodies it creates.
#[derive(Default)]
struct Shared {
    log: RefCell<Vec<String>>,
    throwing: AHashSet<String>,
    gated: AHashSet<String>,
    gates: RefCell<AHashMap<String, PromiseCapability>>,
}

struct RecordingBody {
    name: String,
    shared: Rc<Shared>,
    suspended: bool,
}

impl ModuleBody for RecordingBody {
    fn resume(
        &mut self,
        agent: &mut Agent,
        module: SourceTextModule,
        completion: JsResult<Value>,
    ) -> ModuleBodyStep {
        if let Err(error) = completion {
            self.shared.log.borrow_mut().push(self.name.clone());
            return ModuleBodyStep::Throw(error);
        }
        if module.has_tla(agent) && !self.suspended {
            self.suspended = true;
            if !self.shared.gated.contains(&self.name) {
                return ModuleBodyStep::Await(Value::Undefined);
            }
            let gate = PromiseCapability::new(agent);
            self.shared
                .gates
                .borrow_mut()
                .insert(self.name.clone(), gate);
            return ModuleBodyStep::Await(gate.promise().into());
        }
        self.shared.log.borrow_mut().push(self.name.clone());
        if self.shared.throwing.contains(&self.name) {
            let error = agent.throw_exception(ExceptionType::Error, format!("{} threw", self.name));
            return ModuleBodyStep::Throw(error);
        }
        // Every declared binding that is still uninitialized gets the value
        // "<module>.<binding>".
        let env = module
            .environment(agent)
            .expect("Executing module has an environment");
        for binding in env.binding_names(agent) {
            if !env.is_binding_initialized(agent, &binding) {
                let value = Value::from_str(&format!("{}.{binding}", self.name));
                env.initialize_binding(agent, &binding, value);
            }
        }
        ModuleBodyStep::Return(Value::Undefined)
    }
}

struct PendingLoad {
    referrer: SourceTextModule,
    module_request: ModuleRequestRecord,
    payload: GraphLoadingState,
}

pub struct TestHost {
    promise_job_queue: RefCell<VecDeque<Job>>,
    pending_loads: RefCell<VecDeque<PendingLoad>>,
    sources: AHashMap<String, String>,
    modules: RefCell<AHashMap<String, AbstractModule>>,
    fetches: RefCell<Vec<String>>,
    rejections: RefCell<Vec<(Promise, PromiseRejectionTrackerOperation)>>,
    defer_loading: bool,
    shared: Rc<Shared>,
}

// RefCell doesn't implement Debug
impl Debug for TestHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHost")
            .field("defer_loading", &self.defer_loading)
            .finish()
    }
}

impl TestHost {
    fn parse(&self, agent: &mut Agent, name: &str) -> JsResult<SourceTextModule> {
        let Some(source_text) = self.sources.get(name) else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot find module '{name}'"),
            ));
        };
        let host_defined: HostDefined = Rc::new(name.to_string());
        let body = RecordingBody {
            name: name.to_string(),
            shared: self.shared.clone(),
            suspended: false,
        };
        let module = parse_module(agent, source_text, Some(host_defined), move |_| {
            Box::new(body)
        })
        .map_err(|_| {
            agent.throw_exception(
                ExceptionType::SyntaxError,
                format!("Failed to parse module '{name}'"),
            )
        })?;
        self.modules
            .borrow_mut()
            .insert(name.to_string(), module.into());
        Ok(module)
    }

    fn load(
        &self,
        agent: &mut Agent,
        module_request: &ModuleRequestRecord,
    ) -> JsResult<AbstractModule> {
        let name = module_request.specifier();
        let existing = self.modules.borrow().get(name).copied();
        if let Some(module) = existing {
            return Ok(module);
        }
        self.fetches.borrow_mut().push(name.to_string());
        if module_request.attribute("type") == Some("json") {
            let source_text = self.sources.get(name).cloned().unwrap_or_default();
            let module: AbstractModule =
                create_default_export_synthetic_module(agent, Value::from_str(&source_text), None)
                    .into();
            self.modules.borrow_mut().insert(name.to_string(), module);
            return Ok(module);
        }
        self.parse(agent, name).map(AbstractModule::from)
    }

    fn finish_load(&self, agent: &mut Agent, load: PendingLoad) {
        let result = self.load(agent, &load.module_request);
        finish_loading_imported_module(
            agent,
            load.referrer,
            &load.module_request,
            load.payload,
            result,
        );
    }
}

impl HostHooks for TestHost {
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

    fn promise_rejection_tracker(
        &self,
        promise: Promise,
        operation: PromiseRejectionTrackerOperation,
    ) {
        self.rejections.borrow_mut().push((promise, operation));
    }
}

/// Builder for a [`TestGraph`].
#[derive(Default)]
pub struct TestGraphBuilder {
    sources: AHashMap<String, String>,
    throwing: AHashSet<String>,
    gated: AHashSet<String>,
    defer_loading: bool,
}

impl TestGraphBuilder {
    pub fn module(mut self, name: &str, source_text: &str) -> Self {
        self.sources.insert(name.to_string(), source_text.to_string());
        self
    }

    /// The body of `name` throws after recording itself.
    pub fn throwing(mut self, name: &str) -> Self {
        self.throwing.insert(name.to_string());
        self
    }

    /// The top-level await of `name` waits until the test opens or fails its
    /// gate.
    pub fn gated(mut self, name: &str) -> Self {
        self.gated.insert(name.to_string());
        self
    }

    /// Loads are answered from the job loop instead of synchronously.
    pub fn defer_loading(mut self) -> Self {
        self.defer_loading = true;
        self
    }

    pub fn build(self) -> TestGraph {
        let shared = Rc::new(Shared {
            throwing: self.throwing,
            gated: self.gated,
            ..Default::default()
        });
        let host: &'static TestHost = Box::leak(Box::new(TestHost {
            promise_job_queue: Default::default(),
            pending_loads: Default::default(),
            sources: self.sources,
            modules: Default::default(),
            fetches: Default::default(),
            rejections: Default::default(),
            defer_loading: self.defer_loading,
            shared,
        }));
        TestGraph {
            agent: Agent::new(Options::default(), host),
            host,
        }
    }
}

pub struct TestGraph {
    pub agent: Agent,
    host: &'static TestHost,
}

impl TestGraph {
    pub fn builder() -> TestGraphBuilder {
        TestGraphBuilder::default()
    }

    pub fn new(modules: &[(&str, &str)]) -> Self {
        modules
            .iter()
            .fold(Self::builder(), |builder, (name, source_text)| {
                builder.module(name, source_text)
            })
            .build()
    }

    /// Returns the module named `name`, parsing it if no load has done so
    /// yet.
    pub fn module(&mut self, name: &str) -> SourceTextModule {
        let existing = self.host.modules.borrow().get(name).copied();
        match existing {
            Some(AbstractModule::SourceTextModule(module)) => module,
            Some(AbstractModule::SyntheticModule(_)) => panic!("'{name}' is a synthetic module"),
            None => self
                .host
                .parse(&mut self.agent, name)
                .unwrap_or_else(|_| panic!("'{name}' should parse")),
        }
    }

    pub fn abstract_module(&mut self, name: &str) -> AbstractModule {
        let existing = self.host.modules.borrow().get(name).copied();
        existing.unwrap_or_else(|| self.module(name).into())
    }

    /// Runs promise jobs and answers deferred loads until nothing is left.
    pub fn run_jobs(&mut self) {
        loop {
            let job = self.host.promise_job_queue.borrow_mut().pop_front();
            if let Some(job) = job {
                job.run(&mut self.agent).expect("Promise jobs should not throw");
                continue;
            }
            let load = self.host.pending_loads.borrow_mut().pop_front();
            let Some(load) = load else {
                return;
            };
            self.host.finish_load(&mut self.agent, load);
        }
    }

    /// Answers the oldest deferred load.
    pub fn answer_next_load(&mut self) -> bool {
        let load = self.host.pending_loads.borrow_mut().pop_front();
        match load {
            Some(load) => {
                self.host.finish_load(&mut self.agent, load);
                true
            }
            None => false,
        }
    }

    pub fn pending_load_count(&self) -> usize {
        self.host.pending_loads.borrow().len()
    }

    /// Starts loading the graph of `name` without running any jobs.
    pub fn start_load(&mut self, name: &str) -> Promise {
        let module = self.module(name);
        AbstractModule::from(module).load_requested_modules(&mut self.agent, None)
    }

    /// Loads the graph of `name` and runs all jobs.
    pub fn load(&mut self, name: &str) -> JsResult<()> {
        let promise = self.start_load(name);
        self.run_jobs();
        self.settled(promise).map(|_| ())
    }

    pub fn link(&mut self, name: &str) -> JsResult<LinkedModule> {
        let module = self.module(name);
        AbstractModule::from(module).link(&mut self.agent)
    }

    pub fn load_and_link(&mut self, name: &str) -> LinkedModule {
        self.load(name).expect("Graph should load");
        self.link(name).expect("Graph should link")
    }

    /// Loads, links and starts evaluating `name` without running jobs.
    pub fn start_evaluate(&mut self, name: &str) -> Promise {
        let linked = self.load_and_link(name);
        linked.evaluate(&mut self.agent)
    }

    /// Loads, links and evaluates `name` and runs all jobs.
    pub fn evaluate(&mut self, name: &str) -> Promise {
        let promise = self.start_evaluate(name);
        self.run_jobs();
        promise
    }

    /// Returns the settled result of a promise.
    pub fn settled(&self, promise: Promise) -> JsResult<Value> {
        promise
            .try_get_result(&self.agent)
            .expect("Promise should be settled")
    }

    /// Returns the message of the error a promise was rejected with.
    pub fn rejection_message(&self, promise: Promise) -> String {
        match self.settled(promise) {
            Ok(value) => panic!("Promise was fulfilled with {value:?}"),
            Err(error) => error.to_string(&self.agent),
        }
    }

    pub fn open_gate(&mut self, name: &str) {
        let gate = self.gate(name);
        gate.resolve(&mut self.agent, Value::Undefined);
    }

    pub fn fail_gate(&mut self, name: &str) {
        let gate = self.gate(name);
        let error = self
            .agent
            .throw_exception(ExceptionType::Error, format!("{name} failed"));
        gate.reject(&mut self.agent, error.into_value());
    }

    fn gate(&self, name: &str) -> PromiseCapability {
        *self
            .host
            .shared
            .gates
            .borrow()
            .get(name)
            .unwrap_or_else(|| panic!("'{name}' has not suspended on its gate"))
    }

    pub fn status(&mut self, name: &str) -> CyclicModuleRecordStatus {
        let module = self.module(name);
        module.status(&self.agent)
    }

    pub fn statuses(&mut self, names: &[&str]) -> Vec<CyclicModuleRecordStatus> {
        names.iter().map(|name| self.status(name)).collect()
    }

    /// Names of the module bodies that finished, in order.
    pub fn log(&self) -> Vec<String> {
        self.host.shared.log.borrow().clone()
    }

    /// Names of the modules the host fetched, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.host.fetches.borrow().clone()
    }

    pub fn rejections_of(&self, promise: Promise) -> Vec<PromiseRejectionTrackerOperation> {
        self.host
            .rejections
            .borrow()
            .iter()
            .filter(|(p, _)| *p == promise)
            .map(|(_, operation)| *operation)
            .collect()
    }

    /// Reads a binding from the environment of `name`.
    pub fn binding(&mut self, name: &str, binding: &str) -> JsResult<Value> {
        let module = self.module(name);
        let env = module
            .environment(&self.agent)
            .expect("Module should be linked");
        env.get_binding_value(&mut self.agent, binding)
    }

    /// Returns the name of a module loaded from this graph.
    pub fn name_of(&self, module: AbstractModule) -> String {
        self.host
            .modules
            .borrow()
            .iter()
            .find(|(_, m)| **m == module)
            .map(|(name, _)| name.clone())
            .expect("Module was not loaded by this graph")
    }
}

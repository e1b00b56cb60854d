// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.7 Agents](https://tc39.es/ecma262/#sec-agents)

use std::fmt::Display;

use crate::{
    ecmascript::{
        builtins::{
            Promise,
            control_abstraction_objects::promise_objects::promise_abstract_operations::promise_jobs::{
                PromiseReactionJob, PromiseResolveThenableJob,
            },
            error::ErrorHeapData,
        },
        scripts_and_modules::{
            HostDefined,
            module::module_semantics::{
                ModuleRequestRecord, cyclic_module_records::GraphLoadingState,
                source_text_module_records::SourceTextModule,
            },
        },
        types::Value,
    },
    heap::{CreateHeapData, Heap},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Options {
    /// Print loader, linker and evaluator state transitions to stderr.
    pub print_internals: bool,
}

pub type JsResult<T> = std::result::Result<T, JsError>;

/// A throw completion: the thrown value travels as the error variant of a
/// [`JsResult`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JsError(pub(crate) Value);

impl JsError {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn to_string(&self, agent: &Agent) -> String {
        self.0.string_repr(agent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseRejectionTrackerOperation {
    Reject,
    Handle,
}

pub trait HostHooks: std::fmt::Debug {
    /// ### [9.5.5 HostEnqueuePromiseJob ( job, realm )](https://tc39.es/ecma262/#sec-hostenqueuepromisejob)
    ///
    /// Schedules the job to be performed at some future time. The jobs must
    /// be run in FIFO order, and only once no other job or module evaluation
    /// is on the call stack.
    fn enqueue_promise_job(&self, job: Job);

    /// ### [16.2.1.10 HostLoadImportedModule ( referrer, moduleRequest, hostDefined, payload )](https://tc39.es/ecma262/#sec-HostLoadImportedModule)
    ///
    /// An implementation of HostLoadImportedModule must conform to the
    /// following requirements:
    ///
    /// * The host environment must perform
    ///   `finish_loading_imported_module(agent, referrer, module_request, payload, result)`,
    ///   where result is either the loaded Module Record or a throw
    ///   completion, either synchronously or from a later job.
    /// * If this operation is called multiple times with the same (referrer,
    ///   module_request) pair and it performs
    ///   `finish_loading_imported_module` with a normal result, then it must
    ///   use the same result each time.
    /// * The operation must treat payload as an opaque value to be passed
    ///   through to `finish_loading_imported_module`.
    ///
    /// The actual process performed is host-defined, but typically consists
    /// of performing whatever I/O operations are necessary to load the
    /// appropriate Module Record. Multiple different (referrer,
    /// module_request) pairs may map to the same Module Record instance: a
    /// typical host keeps a module map keyed by the normalized specifier so
    /// that each module is fetched and parsed exactly once.
    fn load_imported_module(
        &self,
        agent: &mut Agent,
        referrer: SourceTextModule,
        module_request: &ModuleRequestRecord,
        host_defined: Option<HostDefined>,
        payload: GraphLoadingState,
    );

    /// ### [27.2.1.9 HostPromiseRejectionTracker ( promise, operation )](https://tc39.es/ecma262/#sec-host-promise-rejection-tracker)
    ///
    /// Called when a promise is rejected without any handlers ("reject"),
    /// and when a handler is first added to such a promise ("handle").
    ///
    /// The default implementation of HostPromiseRejectionTracker is to return
    /// unused.
    fn promise_rejection_tracker(
        &self,
        _promise: Promise,
        _operation: PromiseRejectionTrackerOperation,
    ) {
    }

    /// ### [16.2.1.9 HostGetSupportedImportAttributes ( )](https://tc39.es/ecma262/#sec-hostgetsupportedimportattributes)
    ///
    /// Returns the import attribute keys the host supports. Any import with
    /// an attribute key not in this list fails to load with a SyntaxError.
    fn get_supported_import_attributes(&self) -> &[&'static str] {
        &["type"]
    }
}

#[derive(Debug)]
pub struct Job {
    pub(crate) inner: InnerJob,
}

#[derive(Debug)]
pub(crate) enum InnerJob {
    PromiseResolveThenable(PromiseResolveThenableJob),
    PromiseReaction(PromiseReactionJob),
}

impl Job {
    pub fn run(self, agent: &mut Agent) -> JsResult<()> {
        match self.inner {
            InnerJob::PromiseResolveThenable(job) => job.run(agent),
            InnerJob::PromiseReaction(job) => job.run(agent),
        }
    }
}

/// ### [9.7 Agents](https://tc39.es/ecma262/#sec-agents)
#[derive(Debug)]
pub struct Agent {
    pub(crate) heap: Heap,
    pub(crate) options: Options,
    pub(crate) host_hooks: &'static dyn HostHooks,
    /// ### \[\[ModuleAsyncEvaluationCount]]
    ///
    /// Initially 0, used to assign values to the `[[AsyncEvaluationOrder]]`
    /// field of modules that are asynchronous or have asynchronous
    /// dependencies.
    module_async_evaluation_count: u32,
}

impl Agent {
    pub fn new(options: Options, host_hooks: &'static dyn HostHooks) -> Self {
        Self {
            heap: Heap::new(),
            options,
            host_hooks,
            module_async_evaluation_count: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// ### [5.2.3.2 Throw an Exception](https://tc39.es/ecma262/#sec-throw-an-exception)
    pub fn throw_exception_with_static_message(
        &mut self,
        kind: ExceptionType,
        message: &'static str,
    ) -> JsError {
        JsError(self.create_exception(kind, message.into()))
    }

    /// ### [5.2.3.2 Throw an Exception](https://tc39.es/ecma262/#sec-throw-an-exception)
    pub fn throw_exception(&mut self, kind: ExceptionType, message: String) -> JsError {
        JsError(self.create_exception(kind, message.into()))
    }

    pub(crate) fn create_exception_with_static_message(
        &mut self,
        kind: ExceptionType,
        message: &'static str,
    ) -> Value {
        self.create_exception(kind, message.into())
    }

    fn create_exception(&mut self, kind: ExceptionType, message: std::rc::Rc<str>) -> Value {
        Value::Error(self.heap.create(ErrorHeapData::new(kind, Some(message))))
    }

    /// ### [16.2.1.6.1.3.4 IncrementModuleAsyncEvaluationCount ( )](https://tc39.es/ecma262/#sec-IncrementModuleAsyncEvaluationCount)
    ///
    /// > NOTE: This value is only used to keep track of the relative
    /// > evaluation order between pending modules. An implementation may
    /// > unobservably reset \[\[ModuleAsyncEvaluationCount]] to 0 whenever
    /// > there are no pending modules.
    pub(crate) fn increment_module_async_evaluation_count(&mut self) -> u32 {
        // 1. Let AR be the Agent Record of the surrounding agent.
        // 2. Let count be AR.[[ModuleAsyncEvaluationCount]].
        let count = self.module_async_evaluation_count;
        // 3. Set AR.[[ModuleAsyncEvaluationCount]] to count + 1.
        self.module_async_evaluation_count = count
            .checked_add(1)
            .expect("Module async evaluation count overflowed");
        // 4. Return count.
        count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Error,
    AggregateError,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl Display for ExceptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExceptionType::Error => "Error",
            ExceptionType::AggregateError => "AggregateError",
            ExceptionType::EvalError => "EvalError",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
            ExceptionType::UriError => "URIError",
        })
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.6 Cyclic Module Records](https://tc39.es/ecma262/#sec-cyclic-module-records)

use std::{
    ops::{Index, IndexMut},
    rc::Rc,
};

use ahash::AHashSet;

use crate::{
    ecmascript::{
        builtins::{
            Promise,
            control_abstraction_objects::promise_objects::{
                promise_abstract_operations::{
                    promise_capability_records::PromiseCapability,
                    promise_reaction_records::PromiseReactionHandler,
                },
                promise_prototype::inner_promise_then,
            },
            promise::data::PromiseState,
        },
        execution::{
            Agent, JsResult,
            agent::{ExceptionType, JsError, PromiseRejectionTrackerOperation},
        },
        scripts_and_modules::HostDefined,
        types::Value,
    },
    heap::{CreateHeapData, Heap, indexes::BaseIndex},
};

use super::{
    LoadedModuleRequestRecord, ModuleRequestRecord,
    abstract_module_records::AbstractModule, all_import_attributes_supported,
    get_imported_module, source_text_module_records::SourceTextModule,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CyclicModuleRecordStatus {
    #[default]
    New,
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

/// ### \[\[AsyncEvaluationOrder]]
///
/// unset, an integer, or done
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum AsyncEvaluationOrder {
    #[default]
    Unset,
    Order(u32),
    Done,
}

impl AsyncEvaluationOrder {
    pub(crate) fn is_integer(self) -> bool {
        matches!(self, Self::Order(_))
    }
}

#[derive(Debug)]
pub(crate) struct CyclicModuleRecord {
    /// ### \[\[Status]]
    ///
    /// Initially new. Transitions to unlinked, linking, linked, evaluating,
    /// possibly evaluating-async, evaluated (in that order) as the module
    /// progresses throughout its lifecycle. evaluating-async indicates this
    /// module is queued to execute on completion of its asynchronous
    /// dependencies or it is a module whose `[[HasTLA]]` field is true that
    /// has been executed and is pending top-level completion.
    status: CyclicModuleRecordStatus,
    /// ### \[\[EvaluationError]]
    ///
    /// a throw completion or empty
    ///
    /// A throw completion representing the exception that occurred during
    /// evaluation. undefined if no exception occurred or if `[[Status]]` is
    /// not evaluated.
    evaluation_error: Option<JsError>,
    /// ### \[\[DFSIndex]]
    ///
    /// Auxiliary field used during Link and Evaluate only. If `[[Status]]` is
    /// either linking or evaluating, this non-negative number records the
    /// point at which the module was first visited during the depth-first
    /// traversal of the dependency graph.
    dfs_index: Option<u32>,
    /// ### \[\[DFSAncestorIndex]]
    ///
    /// Auxiliary field used during Link and Evaluate only. If `[[Status]]` is
    /// either linking or evaluating, this is either the module's own
    /// `[[DFSIndex]]` or that of an "earlier" module in the same strongly
    /// connected component.
    dfs_ancestor_index: Option<u32>,
    /// ### \[\[RequestedModules]]
    ///
    /// a List of ModuleRequest Records
    ///
    /// A List of the ModuleRequest Records associated with the imports in this
    /// module. The List is in source text occurrence order of the imports.
    requested_modules: Rc<[ModuleRequestRecord]>,
    /// ### \[\[LoadedModules]]
    ///
    /// a List of LoadedModuleRequest Records
    ///
    /// A map from the specifier strings used by the module represented by this
    /// record to request the importation of a module with the relative import
    /// attributes to the resolved Module Record. The list does not contain two
    /// different Records r1 and r2 such that ModuleRequestsEqual(r1, r2) is true.
    loaded_modules: Vec<LoadedModuleRequestRecord>,
    /// ### \[\[CycleRoot]]
    ///
    /// a Cyclic Module Record or empty
    ///
    /// The first visited module of the cycle, the root DFS ancestor of the
    /// strongly connected component. For a module not in a cycle, this would
    /// be the module itself. Once Evaluate has completed, a module's
    /// `[[DFSAncestorIndex]]` is the `[[DFSIndex]]` of its `[[CycleRoot]]`.
    cycle_root: Option<SourceTextModule>,
    /// ### \[\[HasTLA]]
    ///
    /// Whether this module is individually asynchronous (for example, if it's
    /// a Source Text Module Record containing a top-level await). Having an
    /// asynchronous dependency does not mean this field is true. This field
    /// must not change after the module is parsed.
    has_tla: bool,
    /// ### \[\[AsyncEvaluationOrder]]
    ///
    /// This field is initially set to unset, and remains unset for fully
    /// synchronous modules. For modules that are either themselves
    /// asynchronous or have an asynchronous dependency, it is set to an
    /// integer that determines the order in which execution of pending modules
    /// is queued by 16.2.1.6.1.3.4. Once the pending module is executed, the
    /// field is set to done.
    async_evaluation_order: AsyncEvaluationOrder,
    /// ### \[\[TopLevelCapability]]
    ///
    /// a PromiseCapability Record or empty
    ///
    /// If this module is the `[[CycleRoot]]` of some cycle, and Evaluate() was
    /// called on some module in that cycle, this field contains the
    /// PromiseCapability Record for that entire evaluation. It is used to
    /// settle the Promise object that is returned from the Evaluate() abstract
    /// method. This field will be empty for any dependencies of that module,
    /// unless a top-level Evaluate() has been initiated for some of those
    /// dependencies.
    top_level_capability: Option<PromiseCapability>,
    /// ### \[\[AsyncParentModules]]
    ///
    /// a List of Cyclic Module Records
    ///
    /// If this module or a dependency has `[[HasTLA]]` true, and execution is
    /// in progress, this tracks the parent importers of this module for the
    /// top-level execution job. These parent modules will not start executing
    /// before this module has successfully completed execution.
    async_parent_modules: Vec<SourceTextModule>,
    /// ### \[\[PendingAsyncDependencies]]
    ///
    /// If this module has any asynchronous dependencies, this tracks the
    /// number of asynchronous dependency modules remaining to execute for this
    /// module. A module with asynchronous dependencies will be executed when
    /// this field reaches 0 and there are no execution errors.
    pending_async_dependencies: Option<u32>,
}

impl CyclicModuleRecord {
    pub(super) fn new(r#async: bool, requested_modules: Box<[ModuleRequestRecord]>) -> Self {
        Self {
            status: CyclicModuleRecordStatus::New,
            evaluation_error: None,
            dfs_index: None,
            dfs_ancestor_index: None,
            requested_modules: requested_modules.into(),
            loaded_modules: vec![],
            cycle_root: None,
            has_tla: r#async,
            async_evaluation_order: AsyncEvaluationOrder::Unset,
            top_level_capability: None,
            async_parent_modules: vec![],
            pending_async_dependencies: None,
        }
    }

    /// ### \[\[Status]]
    pub(super) fn status(&self) -> CyclicModuleRecordStatus {
        self.status
    }

    /// ### \[\[EvaluationError]]
    pub(super) fn evaluation_error(&self) -> Option<&JsError> {
        self.evaluation_error.as_ref()
    }

    /// Set \[\[EvaluationError]] to error and \[\[Status]] to evaluated.
    pub(super) fn set_evaluation_error(&mut self, error: JsError) {
        debug_assert!(
            self.evaluation_error.is_none(),
            "Attempted to set module [[EvaluationError]] twice"
        );
        debug_assert!(matches!(
            self.status,
            CyclicModuleRecordStatus::Evaluating | CyclicModuleRecordStatus::EvaluatingAsync
        ));
        self.evaluation_error = Some(error);
        self.status = CyclicModuleRecordStatus::Evaluated;
    }

    /// ### \[\[DFSIndex]]
    pub(super) fn dfs_index(&self) -> Option<u32> {
        self.dfs_index
    }

    /// ### \[\[DFSAncestorIndex]]
    pub(super) fn dfs_ancestor_index(&self) -> Option<u32> {
        self.dfs_ancestor_index
    }

    /// Set \[\[DFSIndex]] and \[\[DFSAncestorIndex]] to index.
    fn set_dfs_index(&mut self, index: u32) {
        self.dfs_index = Some(index);
        self.dfs_ancestor_index = Some(index);
    }

    /// Set \[\[DFSAncestorIndex]] to min(\[\[DFSAncestorIndex]], index).
    fn lower_dfs_ancestor_index(&mut self, index: Option<u32>) {
        self.dfs_ancestor_index = match (self.dfs_ancestor_index, index) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    /// Returns true if \[\[DFSAncestorIndex]] equals \[\[DFSIndex]]: the
    /// module is the root of a strongly connected component.
    fn is_component_root(&self) -> bool {
        debug_assert!(self.dfs_ancestor_index <= self.dfs_index);
        self.dfs_ancestor_index == self.dfs_index
    }

    /// ### \[\[RequestedModules]]
    pub(super) fn requested_modules(&self) -> Rc<[ModuleRequestRecord]> {
        self.requested_modules.clone()
    }

    /// ### \[\[LoadedModules]]
    pub(super) fn loaded_modules(&self) -> &[LoadedModuleRequestRecord] {
        &self.loaded_modules
    }

    pub(super) fn push_loaded_module(&mut self, record: LoadedModuleRequestRecord) {
        self.loaded_modules.push(record);
    }

    /// ### \[\[CycleRoot]]
    pub(super) fn cycle_root(&self) -> Option<SourceTextModule> {
        self.cycle_root
    }

    /// ### \[\[HasTLA]]
    pub(super) fn has_tla(&self) -> bool {
        self.has_tla
    }

    /// ### \[\[AsyncEvaluationOrder]]
    pub(super) fn async_evaluation_order(&self) -> AsyncEvaluationOrder {
        self.async_evaluation_order
    }

    /// ### \[\[TopLevelCapability]]
    pub(super) fn top_level_capability(&self) -> Option<PromiseCapability> {
        self.top_level_capability
    }

    /// ### \[\[PendingAsyncDependencies]]
    pub(super) fn pending_async_dependencies(&self) -> u32 {
        self.pending_async_dependencies.unwrap_or(0)
    }

    /// ### \[\[AsyncParentModules]]
    pub(super) fn async_parent_modules(&self) -> &[SourceTextModule] {
        &self.async_parent_modules
    }

    /// Set module.\[\[Status]] to unlinked.
    fn set_unlinked(&mut self) {
        debug_assert!(matches!(
            self.status,
            CyclicModuleRecordStatus::New | CyclicModuleRecordStatus::Linking
        ));
        self.status = CyclicModuleRecordStatus::Unlinked;
    }

    /// Set module.\[\[Status]] to linking.
    fn set_linking(&mut self) {
        debug_assert!(matches!(self.status, CyclicModuleRecordStatus::Unlinked));
        self.status = CyclicModuleRecordStatus::Linking;
    }

    /// Set module.\[\[Status]] to linked.
    fn set_linked(&mut self) {
        debug_assert!(matches!(self.status, CyclicModuleRecordStatus::Linking));
        self.status = CyclicModuleRecordStatus::Linked;
    }

    /// Set module.\[\[Status]] to evaluating.
    fn set_evaluating(&mut self) {
        debug_assert!(matches!(self.status, CyclicModuleRecordStatus::Linked));
        self.status = CyclicModuleRecordStatus::Evaluating;
    }

    /// Set module.\[\[Status]] to evaluating-async.
    fn set_evaluating_async(&mut self) {
        debug_assert!(matches!(self.status, CyclicModuleRecordStatus::Evaluating));
        self.status = CyclicModuleRecordStatus::EvaluatingAsync;
    }

    /// Set module.\[\[Status]] to evaluated.
    fn set_evaluated(&mut self) {
        debug_assert!(matches!(
            self.status,
            CyclicModuleRecordStatus::Evaluating | CyclicModuleRecordStatus::EvaluatingAsync
        ));
        self.status = CyclicModuleRecordStatus::Evaluated;
    }
}

/// ### [Additional Abstract Methods of Cyclic Module Records](https://tc39.es/ecma262/#table-cyclic-module-methods)
pub(crate) trait CyclicModuleAbstractMethods {
    /// ### InitializeEnvironment()
    ///
    /// Initialize the Environment Record of the module, including resolving
    /// all imported bindings.
    fn initialize_environment(self, agent: &mut Agent) -> JsResult<()>;

    /// ### ExecuteModule(\[promiseCapability])
    ///
    /// Evaluate the module's code within its execution context. If this module
    /// has true in \[\[HasTLA]], then a PromiseCapability Record is passed as
    /// an argument, and the method is expected to resolve or reject the given
    /// capability. In this case, the method must not throw an exception, but
    /// instead reject the PromiseCapability Record if necessary.
    fn execute_module(
        self,
        agent: &mut Agent,
        promise_capability: Option<PromiseCapability>,
    ) -> JsResult<()>;
}

/// ### [16.2.1.6.1.1.1 GraphLoadingState Records](https://tc39.es/ecma262/#graphloadingstate-record)
pub struct GraphLoadingStateRecord {
    /// ### \[\[PromiseCapability]]
    ///
    /// The promise to resolve when the loading process finishes.
    pub(crate) promise_capability: PromiseCapability,
    /// ### \[\[IsLoading]]
    ///
    /// It is true if the loading process has not finished yet, neither
    /// successfully nor with an error.
    pub(crate) is_loading: bool,
    /// ### \[\[PendingModulesCount]]
    ///
    /// It tracks the number of pending HostLoadImportedModule calls.
    pub(crate) pending_modules_count: u32,
    /// ### \[\[Visited]]
    ///
    /// a List of Cyclic Module Records
    ///
    /// It is a list of the Cyclic Module Records that have been already loaded
    /// by the current loading process, to avoid infinite loops with circular
    /// dependencies.
    pub(crate) visited: AHashSet<SourceTextModule>,
    /// ### \[\[HostDefined]]
    ///
    /// It contains host-defined data to pass from the LoadRequestedModules
    /// caller to HostLoadImportedModule.
    pub(crate) host_defined: Option<HostDefined>,
}

// dyn Any doesn't implement Debug
impl std::fmt::Debug for GraphLoadingStateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphLoadingStateRecord")
            .field("promise_capability", &self.promise_capability)
            .field("is_loading", &self.is_loading)
            .field("pending_modules_count", &self.pending_modules_count)
            .field("visited", &self.visited)
            .field("host_defined", &self.host_defined.is_some())
            .finish()
    }
}

/// Handle to the GraphLoadingState Record of one LoadRequestedModules call.
///
/// Hosts treat this as an opaque payload and pass it back to
/// [`finish_loading_imported_module`](super::finish_loading_imported_module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct GraphLoadingState(BaseIndex<GraphLoadingStateRecord>);

impl GraphLoadingState {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// \[\[HostDefined]] of the loading process.
    pub fn host_defined(self, agent: &Agent) -> Option<HostDefined> {
        agent[self].host_defined.clone()
    }

    /// True until the loading process has finished, either successfully or
    /// with an error.
    pub fn is_loading(self, agent: &Agent) -> bool {
        agent[self].is_loading
    }

    /// The promise returned by LoadRequestedModules.
    pub fn promise(self, agent: &Agent) -> Promise {
        agent[self].promise_capability.promise()
    }
}

impl Index<GraphLoadingState> for Agent {
    type Output = GraphLoadingStateRecord;

    fn index(&self, index: GraphLoadingState) -> &Self::Output {
        &self.heap.graph_loading_states[index]
    }
}

impl IndexMut<GraphLoadingState> for Agent {
    fn index_mut(&mut self, index: GraphLoadingState) -> &mut Self::Output {
        &mut self.heap.graph_loading_states[index]
    }
}

impl Index<GraphLoadingState> for Vec<GraphLoadingStateRecord> {
    type Output = GraphLoadingStateRecord;

    fn index(&self, index: GraphLoadingState) -> &Self::Output {
        self.get(index.get_index())
            .expect("GraphLoadingState out of bounds")
    }
}

impl IndexMut<GraphLoadingState> for Vec<GraphLoadingStateRecord> {
    fn index_mut(&mut self, index: GraphLoadingState) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("GraphLoadingState out of bounds")
    }
}

impl CreateHeapData<GraphLoadingStateRecord, GraphLoadingState> for Heap {
    fn create(&mut self, data: GraphLoadingStateRecord) -> GraphLoadingState {
        self.graph_loading_states.push(data);
        GraphLoadingState(BaseIndex::last(&self.graph_loading_states))
    }
}

/// ### [16.2.1.6.1.1 LoadRequestedModules ( \[ hostDefined \] )](https://tc39.es/ecma262/#sec-LoadRequestedModules)
///
/// The LoadRequestedModules concrete method of a Cyclic Module Record
/// module takes optional argument hostDefined (anything) and returns a
/// Promise. It populates the \[\[LoadedModules]] of all the Module Records
/// in the dependency graph of module (most of the work is done by the
/// auxiliary function InnerModuleLoading). It takes an optional
/// hostDefined parameter that is passed to the HostLoadImportedModule
/// hook.
pub(super) fn load_requested_modules(
    agent: &mut Agent,
    module: SourceTextModule,
    host_defined: Option<HostDefined>,
) -> Promise {
    // 1. If hostDefined is not present, let hostDefined be empty.
    // 2. Let pc be ! NewPromiseCapability(%Promise%).
    let promise_capability = PromiseCapability::new(agent);
    // 3. Let state be the GraphLoadingState Record {
    let state = agent.heap.create(GraphLoadingStateRecord {
        // [[PromiseCapability]]: pc,
        promise_capability,
        // [[IsLoading]]: true,
        is_loading: true,
        // [[PendingModulesCount]]: 1,
        pending_modules_count: 1,
        // [[Visited]]: « »,
        visited: AHashSet::new(),
        // [[HostDefined]]: hostDefined
        host_defined,
    });
    // }.
    if agent.options.print_internals {
        eprintln!("Loading module graph of {module:?}");
    }
    // 4. Perform InnerModuleLoading(state, module).
    inner_module_loading(agent, state, module.into());
    // 5. Return pc.[[Promise]].
    promise_capability.promise()
}

/// ### [16.2.1.6.1.1.2 InnerModuleLoading ( state, module )](https://tc39.es/ecma262/#sec-InnerModuleLoading)
///
/// The abstract operation InnerModuleLoading takes arguments state (a
/// GraphLoadingState Record) and module (a Module Record) and returns
/// unused. It is used by LoadRequestedModules to recursively perform the
/// actual loading process for module's dependency graph.
fn inner_module_loading(agent: &mut Agent, state: GraphLoadingState, module: AbstractModule) {
    // 1. Assert: state.[[IsLoading]] is true.
    debug_assert!(agent[state].is_loading);
    // 2. If module is a Cyclic Module Record, module.[[Status]] is new, and
    //    state.[[Visited]] does not contain module, then
    if let AbstractModule::SourceTextModule(module) = module {
        if module.status(agent) == CyclicModuleRecordStatus::New
            // a. Append module to state.[[Visited]].
            && agent[state].visited.insert(module)
        {
            // b. Let requestedModulesCount be the number of elements in
            //    module.[[RequestedModules]].
            let requested_modules = agent[module].cyclic_fields.requested_modules();
            // c. Set state.[[PendingModulesCount]] to
            //    state.[[PendingModulesCount]] + requestedModulesCount.
            agent[state].pending_modules_count += requested_modules.len() as u32;
            // d. For each ModuleRequest Record request of
            //    module.[[RequestedModules]], do
            for request in requested_modules.iter() {
                // i. If AllImportAttributesSupported(request.[[Attributes]])
                //    is false, then
                if !all_import_attributes_supported(agent, request.attributes()) {
                    // 1. Let error be ThrowCompletion(a newly created
                    //    SyntaxError object).
                    let error = agent.throw_exception(
                        ExceptionType::SyntaxError,
                        format!(
                            "Unsupported import attribute in import of '{}'.",
                            request.specifier()
                        ),
                    );
                    // 2. Perform ContinueModuleLoading(state, error).
                    continue_module_loading(agent, state, Err(error));
                } else if let Some(loaded_module) = module.get_loaded_module(agent, request) {
                    // ii. Else if module.[[LoadedModules]] contains a
                    //     LoadedModuleRequest Record record such that
                    //     ModuleRequestsEqual(record, request) is true, then
                    // 1. Perform InnerModuleLoading(state, record.[[Module]]).
                    inner_module_loading(agent, state, loaded_module);
                } else {
                    // iii. Else,
                    // 1. Perform HostLoadImportedModule(module, request,
                    //    state.[[HostDefined]], state).
                    let host_defined = agent[state].host_defined.clone();
                    let host_hooks = agent.host_hooks;
                    host_hooks.load_imported_module(agent, module, request, host_defined, state);
                    // 2. NOTE: HostLoadImportedModule will call
                    //    FinishLoadingImportedModule, which re-enters the
                    //    graph loading process through ContinueModuleLoading.
                }
                // iv. If state.[[IsLoading]] is false, return unused.
                if !agent[state].is_loading {
                    return;
                }
            }
        }
    }
    // 3. Assert: state.[[PendingModulesCount]] ≥ 1.
    debug_assert!(agent[state].pending_modules_count >= 1);
    // 4. Set state.[[PendingModulesCount]] to
    //    state.[[PendingModulesCount]] - 1.
    agent[state].pending_modules_count -= 1;
    // 5. If state.[[PendingModulesCount]] = 0, then
    if agent[state].pending_modules_count == 0 {
        // a. Set state.[[IsLoading]] to false.
        agent[state].is_loading = false;
        // b. For each Cyclic Module Record loaded of state.[[Visited]], do
        let visited = std::mem::take(&mut agent[state].visited);
        for loaded in visited {
            // i. If loaded.[[Status]] is new, set loaded.[[Status]] to
            //    unlinked.
            if loaded.status(agent) == CyclicModuleRecordStatus::New {
                agent[loaded].cyclic_fields.set_unlinked();
            }
        }
        if agent.options.print_internals {
            eprintln!("Finished loading module graph");
        }
        // c. Perform ! Call(state.[[PromiseCapability]].[[Resolve]],
        //    undefined, « undefined »).
        let promise_capability = agent[state].promise_capability;
        promise_capability.resolve(agent, Value::Undefined);
    }
    // 6. Return unused.
}

/// ### [16.2.1.6.1.1.3 ContinueModuleLoading ( state, moduleCompletion )](https://tc39.es/ecma262/#sec-ContinueModuleLoading)
///
/// The abstract operation ContinueModuleLoading takes arguments state (a
/// GraphLoadingState Record) and moduleCompletion (either a normal
/// completion containing a Module Record or a throw completion) and returns
/// unused. It is used to re-enter the loading process after a call to
/// HostLoadImportedModule.
pub(super) fn continue_module_loading(
    agent: &mut Agent,
    state: GraphLoadingState,
    module_completion: JsResult<AbstractModule>,
) {
    // 1. If state.[[IsLoading]] is false, return unused.
    if !agent[state].is_loading {
        return;
    }
    match module_completion {
        // 2. If moduleCompletion is a normal completion, then
        Ok(module) => {
            // a. Perform InnerModuleLoading(state, moduleCompletion.[[Value]]).
            inner_module_loading(agent, state, module);
        }
        // 3. Else,
        Err(error) => {
            // a. Set state.[[IsLoading]] to false.
            agent[state].is_loading = false;
            if agent.options.print_internals {
                eprintln!(
                    "Loading module graph failed: {}",
                    error.to_string(agent)
                );
            }
            // b. Perform ! Call(state.[[PromiseCapability]].[[Reject]],
            //    undefined, « moduleCompletion.[[Value]] »).
            let promise_capability = agent[state].promise_capability;
            promise_capability.reject(agent, error.into_value());
        }
    }
    // 4. Return unused.
}

/// ### [16.2.1.6.1.2 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
///
/// The Link concrete method of a Cyclic Module Record module takes no
/// arguments and returns either a normal completion containing unused or a
/// throw completion. On success, Link transitions this module's
/// \[\[Status]] from unlinked to linked. On failure, an exception is
/// thrown and this module's \[\[Status]] remains unlinked. (Most of the
/// work is done by the auxiliary function InnerModuleLinking.)
pub(super) fn link(agent: &mut Agent, module: SourceTextModule) -> JsResult<()> {
    // 1. Assert: module.[[Status]] is one of unlinked, linked,
    //    evaluating-async, or evaluated.
    debug_assert!(matches!(
        module.status(agent),
        CyclicModuleRecordStatus::Unlinked
            | CyclicModuleRecordStatus::Linked
            | CyclicModuleRecordStatus::EvaluatingAsync
            | CyclicModuleRecordStatus::Evaluated
    ));
    // 2. Let stack be a new empty List.
    let mut stack = Vec::with_capacity(8);
    // 3. Let result be Completion(InnerModuleLinking(module, stack, 0)).
    let result = inner_module_linking(agent, module.into(), &mut stack, 0);
    // 4. If result is an abrupt completion, then
    if let Err(result) = result {
        // a. For each Cyclic Module Record m of stack, do
        for m in stack {
            // i. Assert: m.[[Status]] is linking.
            // ii. Set m.[[Status]] to unlinked.
            agent[m].cyclic_fields.set_unlinked();
        }
        // b. Assert: module.[[Status]] is unlinked.
        debug_assert_eq!(module.status(agent), CyclicModuleRecordStatus::Unlinked);
        if agent.options.print_internals {
            eprintln!("Linking {module:?} failed: {}", result.to_string(agent));
        }
        // c. Return ? result.
        return Err(result);
    }
    // 5. Assert: module.[[Status]] is one of linked, evaluating-async, or
    //    evaluated.
    debug_assert!(matches!(
        module.status(agent),
        CyclicModuleRecordStatus::Linked
            | CyclicModuleRecordStatus::EvaluatingAsync
            | CyclicModuleRecordStatus::Evaluated
    ));
    // 6. Assert: stack is empty.
    debug_assert!(stack.is_empty());
    // 7. Return unused.
    Ok(())
}

/// ### [16.2.1.6.1.2.1 InnerModuleLinking ( module, stack, index )](https://tc39.es/ecma262/#sec-InnerModuleLinking)
///
/// The abstract operation InnerModuleLinking takes arguments module (a Module
/// Record), stack (a List of Cyclic Module Records), and index (a non-negative
/// integer) and returns either a normal completion containing a non-negative
/// integer or a throw completion. It is used by Link to perform the actual
/// linking process for module, as well as recursively on all other modules in
/// the dependency graph. The stack and index parameters, as well as a module's
/// \[\[DFSIndex]] and \[\[DFSAncestorIndex]] fields, keep track of the
/// depth-first search (DFS) traversal. In particular, \[\[DFSAncestorIndex]]
/// is used to discover strongly connected components (SCCs), such that all
/// modules in an SCC transition to linked together.
fn inner_module_linking(
    agent: &mut Agent,
    module: AbstractModule,
    stack: &mut Vec<SourceTextModule>,
    index: u32,
) -> JsResult<u32> {
    // 1. If module is not a Cyclic Module Record, then
    let module = match module {
        AbstractModule::SourceTextModule(module) => module,
        AbstractModule::SyntheticModule(module) => {
            // a. Perform ? module.Link().
            module.link(agent);
            // b. Return index.
            return Ok(index);
        }
    };
    // 2. If module.[[Status]] is one of linking, linked, evaluating-async, or
    //    evaluated, then
    if matches!(
        module.status(agent),
        CyclicModuleRecordStatus::Linking
            | CyclicModuleRecordStatus::Linked
            | CyclicModuleRecordStatus::EvaluatingAsync
            | CyclicModuleRecordStatus::Evaluated
    ) {
        // a. Return index.
        return Ok(index);
    }
    // 3. Assert: module.[[Status]] is unlinked.
    debug_assert_eq!(module.status(agent), CyclicModuleRecordStatus::Unlinked);
    let cyclic_fields = &mut agent[module].cyclic_fields;
    // 4. Set module.[[Status]] to linking.
    cyclic_fields.set_linking();
    // 5. Set module.[[DFSIndex]] to index.
    // 6. Set module.[[DFSAncestorIndex]] to index.
    cyclic_fields.set_dfs_index(index);
    // 7. Set index to index + 1.
    // Note: if this overflows, we have worse issues.
    let mut index = index.wrapping_add(1);
    // 8. Append module to stack.
    stack.push(module);
    // 9. For each ModuleRequest Record request of module.[[RequestedModules]], do
    let requested_modules = agent[module].cyclic_fields.requested_modules();
    for request in requested_modules.iter() {
        // a. Let requiredModule be GetImportedModule(module, request).
        let required_module = get_imported_module(agent, module, request);
        // b. Set index to ? InnerModuleLinking(requiredModule, stack, index).
        index = inner_module_linking(agent, required_module, stack, index)?;
        // c. If requiredModule is a Cyclic Module Record, then
        if let AbstractModule::SourceTextModule(required_module) = required_module {
            let required_status = required_module.status(agent);
            // i. Assert: requiredModule.[[Status]] is one of linking, linked,
            //    evaluating-async, or evaluated.
            debug_assert!(matches!(
                required_status,
                CyclicModuleRecordStatus::Linking
                    | CyclicModuleRecordStatus::Linked
                    | CyclicModuleRecordStatus::EvaluatingAsync
                    | CyclicModuleRecordStatus::Evaluated
            ));
            // ii. Assert: requiredModule.[[Status]] is linking if and only if
            //     stack contains requiredModule.
            debug_assert_eq!(
                required_status == CyclicModuleRecordStatus::Linking,
                stack.contains(&required_module)
            );
            // iii. If requiredModule.[[Status]] is linking, then
            if required_status == CyclicModuleRecordStatus::Linking {
                // 1. Set module.[[DFSAncestorIndex]] to
                //    min(module.[[DFSAncestorIndex]],
                //    requiredModule.[[DFSAncestorIndex]]).
                let required_ancestor_index =
                    agent[required_module].cyclic_fields.dfs_ancestor_index();
                agent[module]
                    .cyclic_fields
                    .lower_dfs_ancestor_index(required_ancestor_index);
            }
        }
    }
    // 10. Perform ? module.InitializeEnvironment().
    module.initialize_environment(agent)?;
    // 11. Assert: module occurs exactly once in stack.
    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    // 12. Assert: module.[[DFSAncestorIndex]] ≤ module.[[DFSIndex]].
    // 13. If module.[[DFSAncestorIndex]] = module.[[DFSIndex]], then
    if agent[module].cyclic_fields.is_component_root() {
        // a. Let done be false.
        // b. Repeat, while done is false,
        //     i. Let requiredModule be the last element of stack.
        //     ii. Remove the last element of stack.
        while let Some(required_module) = stack.pop() {
            // iii. Assert: requiredModule is a Cyclic Module Record.
            // iv. Set requiredModule.[[Status]] to linked.
            agent[required_module].cyclic_fields.set_linked();
            if agent.options.print_internals {
                eprintln!("Linked {required_module:?} (component of {module:?})");
            }
            // v. If requiredModule and module are the same Module Record, set
            //    done to true.
            if required_module == module {
                break;
            }
        }
    }
    // 14. Return index.
    Ok(index)
}

/// ### [16.2.1.6.1.3 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
///
/// The Evaluate concrete method of a Cyclic Module Record module takes no
/// arguments and returns a Promise. Evaluate transitions this module's
/// \[\[Status]] from linked to either evaluating-async or evaluated. The
/// first time it is called on a module in a given strongly connected
/// component, Evaluate creates and returns a Promise which resolves when
/// the module has finished evaluating. This Promise is stored in the
/// \[\[TopLevelCapability]] field of the \[\[CycleRoot]] for the
/// component. Future invocations of Evaluate on any module in the
/// component return the same Promise. (Most of the work is done by the
/// auxiliary function InnerModuleEvaluation.)
pub(super) fn evaluate(agent: &mut Agent, module: SourceTextModule) -> Promise {
    let mut module = module;
    // 1. Assert: This call to Evaluate is not happening at the same time as
    //    another call to Evaluate within the surrounding agent.
    // 2. Assert: module.[[Status]] is one of linked, evaluating-async, or
    //    evaluated.
    debug_assert!(matches!(
        module.status(agent),
        CyclicModuleRecordStatus::Linked
            | CyclicModuleRecordStatus::EvaluatingAsync
            | CyclicModuleRecordStatus::Evaluated
    ));
    // 3. If module.[[Status]] is either evaluating-async or evaluated, then
    if matches!(
        module.status(agent),
        CyclicModuleRecordStatus::EvaluatingAsync | CyclicModuleRecordStatus::Evaluated
    ) {
        // a. If module.[[CycleRoot]] is not empty, then
        if let Some(cycle_root) = module.cycle_root(agent) {
            // i. Set module to module.[[CycleRoot]].
            module = cycle_root;
        } else {
            // b. Else,
            // i. Assert: module.[[Status]] is evaluated and
            //    module.[[EvaluationError]] is a throw completion.
            debug_assert_eq!(module.status(agent), CyclicModuleRecordStatus::Evaluated);
            debug_assert!(module.evaluation_error(agent).is_some());
        }
    }
    // 4. If module.[[TopLevelCapability]] is not empty, then
    if let Some(top_level_capability) = agent[module].cyclic_fields.top_level_capability() {
        // a. Return module.[[TopLevelCapability]].[[Promise]].
        return top_level_capability.promise();
    }
    // 5. Let stack be a new empty List.
    let mut stack = Vec::with_capacity(8);
    // 6. Let capability be ! NewPromiseCapability(%Promise%).
    let capability = PromiseCapability::new(agent);
    // 7. Set module.[[TopLevelCapability]] to capability.
    agent[module].cyclic_fields.top_level_capability = Some(capability);
    // 8. Let result be Completion(InnerModuleEvaluation(module, stack, 0)).
    let result = inner_module_evaluation(agent, module.into(), &mut stack, 0);
    match result {
        // 9. If result is an abrupt completion, then
        Err(result) => {
            // a. For each Cyclic Module Record m of stack, do
            for m in stack {
                // i. Assert: m.[[Status]] is evaluating.
                debug_assert_eq!(m.status(agent), CyclicModuleRecordStatus::Evaluating);
                // ii. Set m.[[Status]] to evaluated.
                // iii. Set m.[[EvaluationError]] to result.
                agent[m].cyclic_fields.set_evaluation_error(result.clone());
            }
            // b. Assert: module.[[Status]] is evaluated.
            debug_assert_eq!(module.status(agent), CyclicModuleRecordStatus::Evaluated);
            // c. Assert: module.[[EvaluationError]] and result are the same
            //    Completion Record.
            debug_assert_eq!(module.evaluation_error(agent).as_ref(), Some(&result));
            if agent.options.print_internals {
                eprintln!("Evaluating {module:?} failed: {}", result.to_string(agent));
            }
            // d. Perform ! Call(capability.[[Reject]], undefined,
            //    « result.[[Value]] »).
            capability.reject(agent, result.into_value());
        }
        // 10. Else,
        Ok(_) => {
            // a. Assert: module.[[Status]] is either evaluating-async or
            //    evaluated.
            debug_assert!(matches!(
                module.status(agent),
                CyclicModuleRecordStatus::EvaluatingAsync | CyclicModuleRecordStatus::Evaluated
            ));
            // b. Assert: module.[[EvaluationError]] is empty.
            debug_assert!(module.evaluation_error(agent).is_none());
            // c. If module.[[Status]] is evaluated, then
            if module.status(agent) == CyclicModuleRecordStatus::Evaluated {
                // i. NOTE: This implies that evaluation of module completed
                //    synchronously.
                // ii. Assert: module.[[AsyncEvaluationOrder]] is unset.
                debug_assert_eq!(
                    agent[module].cyclic_fields.async_evaluation_order(),
                    AsyncEvaluationOrder::Unset
                );
                // iii. Perform ! Call(capability.[[Resolve]], undefined,
                //      « undefined »).
                capability.resolve(agent, Value::Undefined);
            }
            // d. Assert: stack is empty.
            debug_assert!(stack.is_empty());
        }
    }
    // 11. Return capability.[[Promise]].
    capability.promise()
}

/// ### [16.2.1.6.1.3.1 InnerModuleEvaluation ( module, stack, index )](https://tc39.es/ecma262/#sec-innermoduleevaluation)
///
/// The abstract operation InnerModuleEvaluation takes arguments module (a
/// Module Record), stack (a List of Cyclic Module Records), and index (a
/// non-negative integer) and returns either a normal completion containing a
/// non-negative integer or a throw completion. It is used by Evaluate to
/// perform the actual evaluation process for module, as well as recursively on
/// all other modules in the dependency graph. The stack and index parameters,
/// as well as module's \[\[DFSIndex]] and \[\[DFSAncestorIndex]] fields, are
/// used the same way as in InnerModuleLinking.
///
/// > NOTE 1: A module is evaluating while it is being traversed by
/// > InnerModuleEvaluation. A module is evaluated on execution completion or
/// > evaluating-async during execution if its \[\[HasTLA]] field is true or if
/// > it has asynchronous dependencies.
///
/// > NOTE 2: Any modules depending on a module of an asynchronous cycle when
/// > that cycle is not evaluating will instead depend on the execution of the
/// > root of the cycle via \[\[CycleRoot]]. This ensures that the cycle state
/// > can be treated as a single strongly connected component through its root
/// > module state.
fn inner_module_evaluation(
    agent: &mut Agent,
    module: AbstractModule,
    stack: &mut Vec<SourceTextModule>,
    index: u32,
) -> JsResult<u32> {
    // 1. If module is not a Cyclic Module Record, then
    let module = match module {
        AbstractModule::SourceTextModule(module) => module,
        AbstractModule::SyntheticModule(_) => {
            // a. Perform ? EvaluateModuleSync(module).
            evaluate_module_sync(agent, module)?;
            // b. Return index.
            return Ok(index);
        }
    };
    match module.status(agent) {
        // 2. If module.[[Status]] is either evaluating-async or evaluated, then
        CyclicModuleRecordStatus::EvaluatingAsync | CyclicModuleRecordStatus::Evaluated => {
            // a. If module.[[EvaluationError]] is empty, return index.
            // b. Otherwise, return ? module.[[EvaluationError]].
            return match module.evaluation_error(agent) {
                Some(error) => Err(error),
                None => Ok(index),
            };
        }
        // 3. If module.[[Status]] is evaluating, return index.
        CyclicModuleRecordStatus::Evaluating => return Ok(index),
        _ => {}
    }
    // 4. Assert: module.[[Status]] is linked.
    debug_assert_eq!(module.status(agent), CyclicModuleRecordStatus::Linked);
    let cyclic_fields = &mut agent[module].cyclic_fields;
    // 5. Set module.[[Status]] to evaluating.
    cyclic_fields.set_evaluating();
    // 6. Set module.[[DFSIndex]] to index.
    // 7. Set module.[[DFSAncestorIndex]] to index.
    cyclic_fields.set_dfs_index(index);
    // 8. Set module.[[PendingAsyncDependencies]] to 0.
    cyclic_fields.pending_async_dependencies = Some(0);
    cyclic_fields.async_parent_modules.clear();
    // 9. Set index to index + 1.
    let mut index = index.wrapping_add(1);
    // 10. Append module to stack.
    stack.push(module);
    // 11. For each ModuleRequest Record request of module.[[RequestedModules]], do
    let requested_modules = agent[module].cyclic_fields.requested_modules();
    for request in requested_modules.iter() {
        // a. Let requiredModule be GetImportedModule(module, request).
        let required_module = get_imported_module(agent, module, request);
        // b. Set index to ? InnerModuleEvaluation(requiredModule, stack, index).
        index = inner_module_evaluation(agent, required_module, stack, index)?;
        // c. If requiredModule is a Cyclic Module Record, then
        let AbstractModule::SourceTextModule(mut required_module) = required_module else {
            continue;
        };
        let required_status = required_module.status(agent);
        // i. Assert: requiredModule.[[Status]] is one of evaluating,
        //    evaluating-async, or evaluated.
        debug_assert!(matches!(
            required_status,
            CyclicModuleRecordStatus::Evaluating
                | CyclicModuleRecordStatus::EvaluatingAsync
                | CyclicModuleRecordStatus::Evaluated
        ));
        // ii. Assert: requiredModule.[[Status]] is evaluating if and only if
        //     stack contains requiredModule.
        debug_assert_eq!(
            required_status == CyclicModuleRecordStatus::Evaluating,
            stack.contains(&required_module)
        );
        // iii. If requiredModule.[[Status]] is evaluating, then
        if required_status == CyclicModuleRecordStatus::Evaluating {
            // 1. Set module.[[DFSAncestorIndex]] to
            //    min(module.[[DFSAncestorIndex]],
            //    requiredModule.[[DFSAncestorIndex]]).
            let required_ancestor_index =
                agent[required_module].cyclic_fields.dfs_ancestor_index();
            agent[module]
                .cyclic_fields
                .lower_dfs_ancestor_index(required_ancestor_index);
        } else {
            // iv. Else,
            // 1. Set requiredModule to requiredModule.[[CycleRoot]].
            required_module = required_module
                .cycle_root(agent)
                .expect("Evaluated module has no [[CycleRoot]]");
            // 2. Assert: requiredModule.[[Status]] is either evaluating-async
            //    or evaluated.
            debug_assert!(matches!(
                required_module.status(agent),
                CyclicModuleRecordStatus::EvaluatingAsync | CyclicModuleRecordStatus::Evaluated
            ));
            // 3. If requiredModule.[[EvaluationError]] is not empty, return ?
            //    requiredModule.[[EvaluationError]].
            if let Some(error) = required_module.evaluation_error(agent) {
                return Err(error);
            }
        }
        // v. If requiredModule.[[AsyncEvaluationOrder]] is an integer, then
        if agent[required_module]
            .cyclic_fields
            .async_evaluation_order()
            .is_integer()
        {
            // 1. Set module.[[PendingAsyncDependencies]] to
            //    module.[[PendingAsyncDependencies]] + 1.
            let cyclic_fields = &mut agent[module].cyclic_fields;
            cyclic_fields.pending_async_dependencies =
                Some(cyclic_fields.pending_async_dependencies() + 1);
            // 2. Append module to requiredModule.[[AsyncParentModules]].
            agent[required_module]
                .cyclic_fields
                .async_parent_modules
                .push(module);
        }
    }
    // 12. If module.[[PendingAsyncDependencies]] > 0 or module.[[HasTLA]] is
    //     true, then
    let pending_async_dependencies = agent[module].cyclic_fields.pending_async_dependencies();
    if pending_async_dependencies > 0 || module.has_tla(agent) {
        // a. Assert: module.[[AsyncEvaluationOrder]] is unset.
        debug_assert_eq!(
            agent[module].cyclic_fields.async_evaluation_order(),
            AsyncEvaluationOrder::Unset
        );
        // b. Set module.[[AsyncEvaluationOrder]] to
        //    IncrementModuleAsyncEvaluationCount().
        let order = agent.increment_module_async_evaluation_count();
        agent[module].cyclic_fields.async_evaluation_order = AsyncEvaluationOrder::Order(order);
        // c. If module.[[PendingAsyncDependencies]] = 0, perform
        //    ExecuteAsyncModule(module).
        if pending_async_dependencies == 0 {
            execute_async_module(agent, module);
        }
    } else {
        // 13. Else,
        // a. Perform ? module.ExecuteModule().
        module.execute_module(agent, None)?;
    }
    // 14. Assert: module occurs exactly once in stack.
    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    // 15. Assert: module.[[DFSAncestorIndex]] ≤ module.[[DFSIndex]].
    // 16. If module.[[DFSAncestorIndex]] = module.[[DFSIndex]], then
    if agent[module].cyclic_fields.is_component_root() {
        // a. Let done be false.
        // b. Repeat, while done is false,
        //     i. Let requiredModule be the last element of stack.
        //     ii. Remove the last element of stack.
        while let Some(required_module) = stack.pop() {
            // iii. Assert: requiredModule is a Cyclic Module Record.
            let cyclic_fields = &mut agent[required_module].cyclic_fields;
            // iv. Assert: requiredModule.[[AsyncEvaluationOrder]] is either
            //     an integer or unset.
            debug_assert_ne!(
                cyclic_fields.async_evaluation_order(),
                AsyncEvaluationOrder::Done
            );
            if cyclic_fields.async_evaluation_order() == AsyncEvaluationOrder::Unset {
                // v. If requiredModule.[[AsyncEvaluationOrder]] is unset, set
                //    requiredModule.[[Status]] to evaluated.
                cyclic_fields.set_evaluated();
            } else {
                // vi. Otherwise, set requiredModule.[[Status]] to
                //     evaluating-async.
                cyclic_fields.set_evaluating_async();
            }
            // viii. Set requiredModule.[[CycleRoot]] to module.
            cyclic_fields.cycle_root = Some(module);
            // vii. If requiredModule and module are the same Module Record,
            //      set done to true.
            if required_module == module {
                break;
            }
        }
    }
    // 17. Return index.
    Ok(index)
}

/// ### [16.2.1.6.1.3.2 ExecuteAsyncModule ( module )](https://tc39.es/ecma262/#sec-execute-async-module)
///
/// The abstract operation ExecuteAsyncModule takes argument module (a Cyclic
/// Module Record) and returns unused.
fn execute_async_module(agent: &mut Agent, module: SourceTextModule) {
    // 1. Assert: module.[[Status]] is either evaluating or evaluating-async.
    debug_assert!(matches!(
        module.status(agent),
        CyclicModuleRecordStatus::Evaluating | CyclicModuleRecordStatus::EvaluatingAsync
    ));
    // 2. Assert: module.[[HasTLA]] is true.
    debug_assert!(module.has_tla(agent));
    if agent.options.print_internals {
        eprintln!("Starting asynchronous execution of {module:?}");
    }
    // 3. Let capability be ! NewPromiseCapability(%Promise%).
    let capability = PromiseCapability::new(agent);
    // 4. Let fulfilledClosure be a new Abstract Closure with no parameters
    //    that captures module and performs the following steps when called:
    //     a. Perform AsyncModuleExecutionFulfilled(module).
    //     b. Return undefined.
    // 5. Let onFulfilled be CreateBuiltinFunction(fulfilledClosure, 0, "", « »).
    // 6. Let rejectedClosure be a new Abstract Closure with parameters (error)
    //    that captures module and performs the following steps when called:
    //     a. Perform AsyncModuleExecutionRejected(module, error).
    //     b. Return undefined.
    // 7. Let onRejected be CreateBuiltinFunction(rejectedClosure, 0, "", « »).
    let handler = PromiseReactionHandler::AsyncModule(module);
    // 8. Perform PerformPromiseThen(capability.[[Promise]], onFulfilled,
    //    onRejected).
    inner_promise_then(agent, capability.promise(), handler, handler, None);
    // 9. Perform ! module.ExecuteModule(capability).
    let result = module.execute_module(agent, Some(capability));
    debug_assert!(result.is_ok());
    // 10. Return unused.
}

/// ### [16.2.1.6.1.3.3 GatherAvailableAncestors ( module, execList )](https://tc39.es/ecma262/#sec-gather-available-ancestors)
///
/// The abstract operation GatherAvailableAncestors takes arguments module (a
/// Cyclic Module Record) and execList (a List of Cyclic Module Records) and
/// returns unused.
///
/// > NOTE: When an asynchronous execution for a root module is fulfilled,
/// > this function determines the list of modules which are able to
/// > synchronously execute together on this completion, populating them in
/// > execList.
fn gather_available_ancestors(
    agent: &mut Agent,
    module: SourceTextModule,
    exec_list: &mut Vec<SourceTextModule>,
) {
    // 1. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    let async_parent_modules = agent[module].cyclic_fields.async_parent_modules().to_vec();
    for m in async_parent_modules {
        // a. If execList does not contain m and
        //    m.[[CycleRoot]].[[EvaluationError]] is empty, then
        let cycle_root_failed = m
            .cycle_root(agent)
            .is_some_and(|cycle_root| cycle_root.evaluation_error(agent).is_some());
        if exec_list.contains(&m) || cycle_root_failed {
            continue;
        }
        let cyclic_fields = &mut agent[m].cyclic_fields;
        // i. Assert: m.[[Status]] is evaluating-async.
        debug_assert_eq!(
            cyclic_fields.status(),
            CyclicModuleRecordStatus::EvaluatingAsync
        );
        // ii. Assert: m.[[EvaluationError]] is empty.
        debug_assert!(cyclic_fields.evaluation_error().is_none());
        // iii. Assert: m.[[AsyncEvaluationOrder]] is an integer.
        debug_assert!(cyclic_fields.async_evaluation_order().is_integer());
        // iv. Assert: m.[[PendingAsyncDependencies]] > 0.
        debug_assert!(cyclic_fields.pending_async_dependencies() > 0);
        // v. Set m.[[PendingAsyncDependencies]] to
        //    m.[[PendingAsyncDependencies]] - 1.
        let pending_async_dependencies = cyclic_fields.pending_async_dependencies() - 1;
        cyclic_fields.pending_async_dependencies = Some(pending_async_dependencies);
        // vi. If m.[[PendingAsyncDependencies]] = 0, then
        if pending_async_dependencies == 0 {
            // 1. Append m to execList.
            exec_list.push(m);
            // 2. If m.[[HasTLA]] is false, perform
            //    GatherAvailableAncestors(m, execList).
            if !m.has_tla(agent) {
                gather_available_ancestors(agent, m, exec_list);
            }
        }
    }
    // 2. Return unused.
}

/// ### [16.2.1.6.1.3.4 AsyncModuleExecutionFulfilled ( module )](https://tc39.es/ecma262/#sec-async-module-execution-fulfilled)
///
/// The abstract operation AsyncModuleExecutionFulfilled takes argument
/// module (a Cyclic Module Record) and returns unused.
pub(crate) fn async_module_execution_fulfilled(agent: &mut Agent, module: SourceTextModule) {
    // 1. If module.[[Status]] is evaluated, then
    if module.status(agent) == CyclicModuleRecordStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not empty.
        debug_assert!(module.evaluation_error(agent).is_some());
        // b. Return unused.
        return;
    }
    let cyclic_fields = &mut agent[module].cyclic_fields;
    // 2. Assert: module.[[Status]] is evaluating-async.
    debug_assert_eq!(
        cyclic_fields.status(),
        CyclicModuleRecordStatus::EvaluatingAsync
    );
    // 3. Assert: module.[[AsyncEvaluationOrder]] is an integer.
    debug_assert!(cyclic_fields.async_evaluation_order().is_integer());
    // 4. Assert: module.[[EvaluationError]] is empty.
    debug_assert!(cyclic_fields.evaluation_error().is_none());
    // 5. Set module.[[AsyncEvaluationOrder]] to done.
    cyclic_fields.async_evaluation_order = AsyncEvaluationOrder::Done;
    // 6. Set module.[[Status]] to evaluated.
    cyclic_fields.set_evaluated();
    if agent.options.print_internals {
        eprintln!("Asynchronous execution of {module:?} fulfilled");
    }
    // 7. If module.[[TopLevelCapability]] is not empty, then
    if let Some(top_level_capability) = agent[module].cyclic_fields.top_level_capability() {
        // a. Assert: module.[[CycleRoot]] and module are the same Module
        //    Record.
        debug_assert_eq!(module.cycle_root(agent), Some(module));
        // b. Perform ! Call(module.[[TopLevelCapability]].[[Resolve]],
        //    undefined, « undefined »).
        top_level_capability.resolve(agent, Value::Undefined);
    }
    // 8. Let execList be a new empty List.
    let mut exec_list = Vec::new();
    // 9. Perform GatherAvailableAncestors(module, execList).
    gather_available_ancestors(agent, module, &mut exec_list);
    // 10. Assert: All elements of execList have their
    //     [[AsyncEvaluationOrder]] field set to an integer, their
    //     [[PendingAsyncDependencies]] field set to 0, and their
    //     [[EvaluationError]] field set to empty.
    debug_assert!(exec_list.iter().all(|m| {
        let cyclic_fields = &agent[*m].cyclic_fields;
        cyclic_fields.async_evaluation_order().is_integer()
            && cyclic_fields.pending_async_dependencies() == 0
            && cyclic_fields.evaluation_error().is_none()
    }));
    // 11. Let sortedExecList be a List whose elements are the elements of
    //     execList, sorted by their [[AsyncEvaluationOrder]] field in
    //     ascending order.
    exec_list.sort_by_key(|m| agent[*m].cyclic_fields.async_evaluation_order());
    // 12. For each Cyclic Module Record m of sortedExecList, do
    for m in exec_list {
        // a. If m.[[Status]] is evaluated, then
        if m.status(agent) == CyclicModuleRecordStatus::Evaluated {
            // i. Assert: m.[[EvaluationError]] is not empty.
            debug_assert!(m.evaluation_error(agent).is_some());
        } else if m.has_tla(agent) {
            // b. Else if m.[[HasTLA]] is true, then
            // i. Perform ExecuteAsyncModule(m).
            execute_async_module(agent, m);
        } else {
            // c. Else,
            // i. Let result be m.ExecuteModule().
            let result = m.execute_module(agent, None);
            match result {
                // ii. If result is an abrupt completion, then
                Err(error) => {
                    // 1. Perform AsyncModuleExecutionRejected(m, result.[[Value]]).
                    async_module_execution_rejected(agent, m, error);
                }
                // iii. Else,
                Ok(()) => {
                    let cyclic_fields = &mut agent[m].cyclic_fields;
                    // 1. Set m.[[AsyncEvaluationOrder]] to done.
                    cyclic_fields.async_evaluation_order = AsyncEvaluationOrder::Done;
                    // 2. Set m.[[Status]] to evaluated.
                    cyclic_fields.set_evaluated();
                    // 3. If m.[[TopLevelCapability]] is not empty, then
                    if let Some(top_level_capability) = cyclic_fields.top_level_capability() {
                        // a. Assert: m.[[CycleRoot]] and m are the same
                        //    Module Record.
                        debug_assert_eq!(m.cycle_root(agent), Some(m));
                        // b. Perform ! Call(m.[[TopLevelCapability]].[[Resolve]],
                        //    undefined, « undefined »).
                        top_level_capability.resolve(agent, Value::Undefined);
                    }
                }
            }
        }
    }
    // 13. Return unused.
}

/// ### [16.2.1.6.1.3.5 AsyncModuleExecutionRejected ( module, error )](https://tc39.es/ecma262/#sec-async-module-execution-rejected)
///
/// The abstract operation AsyncModuleExecutionRejected takes arguments
/// module (a Cyclic Module Record) and error (an ECMAScript language value)
/// and returns unused.
pub(crate) fn async_module_execution_rejected(
    agent: &mut Agent,
    module: SourceTextModule,
    error: JsError,
) {
    // 1. If module.[[Status]] is evaluated, then
    if module.status(agent) == CyclicModuleRecordStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not empty.
        debug_assert!(module.evaluation_error(agent).is_some());
        // b. Return unused.
        return;
    }
    let cyclic_fields = &mut agent[module].cyclic_fields;
    // 2. Assert: module.[[Status]] is evaluating-async.
    debug_assert_eq!(
        cyclic_fields.status(),
        CyclicModuleRecordStatus::EvaluatingAsync
    );
    // 3. Assert: module.[[AsyncEvaluationOrder]] is an integer.
    debug_assert!(cyclic_fields.async_evaluation_order().is_integer());
    // 4. Assert: module.[[EvaluationError]] is empty.
    // 5. Set module.[[EvaluationError]] to ThrowCompletion(error).
    // 6. Set module.[[Status]] to evaluated.
    cyclic_fields.set_evaluation_error(error.clone());
    // 7. Set module.[[AsyncEvaluationOrder]] to done.
    cyclic_fields.async_evaluation_order = AsyncEvaluationOrder::Done;
    if agent.options.print_internals {
        eprintln!(
            "Asynchronous execution of {module:?} rejected: {}",
            error.to_string(agent)
        );
    }
    // 8. NOTE: module.[[AsyncEvaluationOrder]] is set to done for symmetry
    //    with AsyncModuleExecutionFulfilled. In InnerModuleEvaluation, the
    //    value of a module's [[AsyncEvaluationOrder]] internal slot is unused
    //    when its [[EvaluationError]] internal slot is not empty.
    // 9. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    let async_parent_modules = agent[module].cyclic_fields.async_parent_modules().to_vec();
    for m in async_parent_modules {
        // a. Perform AsyncModuleExecutionRejected(m, error).
        async_module_execution_rejected(agent, m, error.clone());
    }
    // 10. If module.[[TopLevelCapability]] is not empty, then
    if let Some(top_level_capability) = agent[module].cyclic_fields.top_level_capability() {
        // a. Assert: module.[[CycleRoot]] and module are the same Module
        //    Record.
        debug_assert_eq!(module.cycle_root(agent), Some(module));
        // b. Perform ! Call(module.[[TopLevelCapability]].[[Reject]],
        //    undefined, « error »).
        top_level_capability.reject(agent, error.into_value());
    }
    // 11. Return unused.
}

/// ### [16.2.1.6.1.3.6 EvaluateModuleSync ( module )](https://tc39.es/ecma262/#sec-EvaluateModuleSync)
///
/// The abstract operation EvaluateModuleSync takes argument module (a
/// Module Record) and returns either a normal completion containing unused
/// or a throw completion. It synchronously evaluates module, provided that
/// the caller guarantees that module's evaluation will return an already
/// settled promise.
fn evaluate_module_sync(agent: &mut Agent, module: AbstractModule) -> JsResult<()> {
    // 1. Assert: module is not a Cyclic Module Record.
    let AbstractModule::SyntheticModule(module) = module else {
        unreachable!("EvaluateModuleSync called with a Cyclic Module Record");
    };
    // 2. Let promise be module.Evaluate().
    let promise = module.evaluate(agent);
    let (error, was_handled) = match &mut agent[promise].promise_state {
        // 3. Assert: promise.[[PromiseState]] is either fulfilled or rejected.
        PromiseState::Pending { .. } => {
            debug_assert!(false, "Non-cyclic module returned a pending promise");
            return Ok(());
        }
        // 5. Return unused.
        PromiseState::Fulfilled { .. } => return Ok(()),
        // 4. If promise.[[PromiseState]] is rejected, then
        PromiseState::Rejected {
            promise_result,
            is_handled,
        } => {
            // b. Set promise.[[PromiseIsHandled]] to true.
            let was_handled = std::mem::replace(is_handled, true);
            (JsError::new(promise_result.clone()), was_handled)
        }
    };
    // a. If promise.[[PromiseIsHandled]] is false, perform
    //    HostPromiseRejectionTracker(promise, "handle").
    if !was_handled {
        agent
            .host_hooks
            .promise_rejection_tracker(promise, PromiseRejectionTrackerOperation::Handle);
    }
    // c. Return ThrowCompletion(promise.[[PromiseResult]]).
    Err(error)
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [Synthetic Module Records](https://tc39.es/proposal-json-modules/#sec-synthetic-module-records)
//!
//! A Synthetic Module Record is used to represent information about a module
//! that is defined by specifications or hosts. Its exported names are
//! statically defined at creation, while their corresponding values can
//! change over time using SetSyntheticModuleExport. It has no imports or
//! dependencies.

use std::{
    ops::{Index, IndexMut},
    rc::Rc,
};

use crate::{
    ecmascript::{
        builtins::Promise,
        execution::{
            Agent, JsResult,
            agent::ExceptionType,
            environments::new_module_environment,
        },
        scripts_and_modules::HostDefined,
        types::Value,
    },
    heap::{CreateHeapData, Heap, indexes::BaseIndex},
};

use super::{
    ResolveExportResult, ResolvedBinding, ResolvedBindingName,
    abstract_module_records::AbstractModuleRecord,
};

/// ### \[\[EvaluationSteps]]
///
/// The initialization logic to perform upon evaluation of the module, taking
/// the Synthetic Module Record as its sole argument. It usually sets up the
/// exported values using SetSyntheticModuleExport.
pub type SyntheticModuleEvaluationSteps =
    Box<dyn FnOnce(&mut Agent, SyntheticModule) -> JsResult<()>>;

pub struct SyntheticModuleRecord {
    /// [Module Record Fields](https://tc39.es/ecma262/#table-module-record-fields)
    pub(crate) abstract_fields: AbstractModuleRecord,
    /// ### \[\[ExportNames]]
    ///
    /// The names of the exports of the module. This list does not contain
    /// duplicates.
    export_names: Box<[Rc<str>]>,
    /// Taken when the module is first evaluated.
    evaluation_steps: Option<SyntheticModuleEvaluationSteps>,
    /// Result of the first evaluation.
    evaluation_promise: Option<Promise>,
}

// dyn FnOnce doesn't implement Debug
impl std::fmt::Debug for SyntheticModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticModuleRecord")
            .field("abstract_fields", &self.abstract_fields)
            .field("export_names", &self.export_names)
            .field("evaluation_steps", &self.evaluation_steps.is_some())
            .field("evaluation_promise", &self.evaluation_promise)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SyntheticModule(BaseIndex<SyntheticModuleRecord>);

impl SyntheticModule {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// ### \[\[ExportNames]]
    pub fn export_names(self, agent: &Agent) -> &[Rc<str>] {
        &agent[self].export_names
    }

    /// ### LoadRequestedModules ( )
    ///
    /// Synthetic modules have no dependencies.
    pub(super) fn load_requested_modules(self, agent: &mut Agent) -> Promise {
        // 1. Return ! PromiseResolve(%Promise%, undefined).
        Promise::new_resolved(agent, Value::Undefined)
    }

    /// ### GetExportedNames ( )
    pub(super) fn get_exported_names(self, agent: &Agent) -> Vec<Rc<str>> {
        // 1. Return module.[[ExportNames]].
        self.export_names(agent).to_vec()
    }

    /// ### ResolveExport ( exportName )
    pub(super) fn resolve_export(self, agent: &Agent, export_name: &str) -> ResolveExportResult {
        // 1. If module.[[ExportNames]] does not contain exportName, return null.
        let Some(name) = self
            .export_names(agent)
            .iter()
            .find(|name| &***name == export_name)
        else {
            return ResolveExportResult::Null;
        };
        // 2. Return ResolvedBinding Record { [[Module]]: module,
        //    [[BindingName]]: exportName }.
        ResolveExportResult::Resolved(ResolvedBinding {
            module: self.into(),
            binding_name: ResolvedBindingName::String(name.clone()),
        })
    }

    /// ### Link ( )
    ///
    /// Linking an already linked synthetic module does nothing.
    pub(super) fn link(self, agent: &mut Agent) {
        if agent[self].abstract_fields.environment.is_some() {
            return;
        }
        // 1. Let realm be module.[[Realm]].
        // 2. Let env be NewModuleEnvironment(realm.[[GlobalEnv]]).
        let env = new_module_environment(agent);
        // 3. Set module.[[Environment]] to env.
        agent[self].abstract_fields.environment = Some(env);
        // 4. For each String exportName in module.[[ExportNames]], do
        let export_names = agent[self].export_names.clone();
        for export_name in export_names.iter() {
            // a. Perform ! env.CreateMutableBinding(exportName, false).
            env.create_mutable_binding(agent, export_name);
            // b. Perform ! env.InitializeBinding(exportName, undefined).
            env.initialize_binding(agent, export_name, Value::Undefined);
        }
        // 5. Return unused.
    }

    /// ### Evaluate ( )
    ///
    /// The evaluation steps run only once. Later calls return the promise of
    /// the first evaluation.
    pub(super) fn evaluate(self, agent: &mut Agent) -> Promise {
        if let Some(promise) = agent[self].evaluation_promise {
            return promise;
        }
        // 1. Let moduleContext be a new ECMAScript code execution context.
        // ...
        // 5. Let steps be module.[[EvaluationSteps]].
        let steps = agent[self].evaluation_steps.take();
        // 6. Let result be Completion(steps(module)).
        let result = match steps {
            Some(steps) => steps(agent, self),
            None => Ok(()),
        };
        // 7. Suspend moduleContext and remove it from the execution context
        //    stack.
        // 8. Resume the context that is now on the top of the execution
        //    context stack as the running execution context.
        // 9. Let pc be ! NewPromiseCapability(%Promise%).
        let promise = match result {
            // 10. IfAbruptRejectPromise(result, pc).
            Err(error) => Promise::new_rejected(agent, error.into_value()),
            // 11. Perform ! Call(pc.[[Resolve]], undefined, « undefined »).
            Ok(()) => Promise::new_resolved(agent, Value::Undefined),
        };
        agent[self].evaluation_promise = Some(promise);
        if agent.options.print_internals {
            eprintln!("Evaluated {self:?}");
        }
        // 12. Return pc.[[Promise]].
        promise
    }
}

impl Index<SyntheticModule> for Agent {
    type Output = SyntheticModuleRecord;

    fn index(&self, index: SyntheticModule) -> &Self::Output {
        &self.heap.synthetic_module_records[index]
    }
}

impl IndexMut<SyntheticModule> for Agent {
    fn index_mut(&mut self, index: SyntheticModule) -> &mut Self::Output {
        &mut self.heap.synthetic_module_records[index]
    }
}

impl Index<SyntheticModule> for Vec<SyntheticModuleRecord> {
    type Output = SyntheticModuleRecord;

    fn index(&self, index: SyntheticModule) -> &Self::Output {
        self.get(index.get_index())
            .expect("SyntheticModule out of bounds")
    }
}

impl IndexMut<SyntheticModule> for Vec<SyntheticModuleRecord> {
    fn index_mut(&mut self, index: SyntheticModule) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("SyntheticModule out of bounds")
    }
}

impl CreateHeapData<SyntheticModuleRecord, SyntheticModule> for Heap {
    fn create(&mut self, data: SyntheticModuleRecord) -> SyntheticModule {
        self.synthetic_module_records.push(data);
        SyntheticModule(BaseIndex::last(&self.synthetic_module_records))
    }
}

/// ### [1.2.1 CreateSyntheticModule ( exportNames, evaluationSteps, realm, hostDefined )](https://tc39.es/proposal-json-modules/#sec-create-synthetic-module)
///
/// Duplicate export names are dropped.
pub fn create_synthetic_module(
    agent: &mut Agent,
    export_names: impl IntoIterator<Item = Rc<str>>,
    evaluation_steps: SyntheticModuleEvaluationSteps,
    host_defined: Option<HostDefined>,
) -> SyntheticModule {
    let mut names: Vec<Rc<str>> = vec![];
    for name in export_names {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    // 1. Return Synthetic Module Record { [[Realm]]: realm, [[Environment]]:
    //    empty, [[Namespace]]: empty, [[HostDefined]]: hostDefined,
    //    [[ExportNames]]: exportNames, [[EvaluationSteps]]: evaluationSteps }.
    agent.heap.create(SyntheticModuleRecord {
        abstract_fields: AbstractModuleRecord::new(host_defined),
        export_names: names.into_boxed_slice(),
        evaluation_steps: Some(evaluation_steps),
        evaluation_promise: None,
    })
}

/// ### [1.2.2 CreateDefaultExportSyntheticModule ( defaultExport )](https://tc39.es/proposal-json-modules/#sec-create-default-export-synthetic-module)
///
/// Creates a Synthetic Module Record whose default export is `default_export`.
pub fn create_default_export_synthetic_module(
    agent: &mut Agent,
    default_export: Value,
    host_defined: Option<HostDefined>,
) -> SyntheticModule {
    // 1. Let realm be the current Realm Record.
    // 2. Let setDefaultExport be a new Abstract Closure with parameters
    //    (module) that captures defaultExport and performs the following
    //    steps when called:
    let set_default_export: SyntheticModuleEvaluationSteps = Box::new(move |agent, module| {
        // a. Perform SetSyntheticModuleExport(module, "default", defaultExport).
        // b. Return NormalCompletion(unused).
        set_synthetic_module_export(agent, module, "default", default_export)
    });
    // 3. Return CreateSyntheticModule(« "default" », setDefaultExport, realm,
    //    defaultExport).
    create_synthetic_module(
        agent,
        ["default".into()],
        set_default_export,
        host_defined,
    )
}

/// ### [1.2.3 SetSyntheticModuleExport ( module, exportName, exportValue )](https://tc39.es/proposal-json-modules/#sec-setsyntheticmoduleexport)
///
/// Can be used to set or change the exported value for an existing export
/// of a Synthetic Module Record. Throws a ReferenceError if the module has
/// not been linked or does not export `export_name`.
pub fn set_synthetic_module_export(
    agent: &mut Agent,
    module: SyntheticModule,
    export_name: &str,
    export_value: Value,
) -> JsResult<()> {
    let Some(env) = agent[module].abstract_fields.environment else {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::ReferenceError,
            "Cannot set an export of a synthetic module before it is linked.",
        ));
    };
    // 1. Return ? module.[[Environment]].SetMutableBinding(exportName,
    //    exportValue, true).
    env.set_mutable_binding(agent, export_name, export_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecmascript::{
        execution::{DefaultHostHooks, Options},
        scripts_and_modules::module::module_semantics::abstract_module_records::AbstractModule,
    };

    fn agent() -> Agent {
        let host_hooks: &DefaultHostHooks = Box::leak(Box::default());
        Agent::new(Options::default(), host_hooks)
    }

    #[test]
    fn default_export_is_set_on_evaluation() {
        let mut agent = agent();
        let module =
            create_default_export_synthetic_module(&mut agent, Value::from_str("{}"), None);
        let linked = AbstractModule::from(module)
            .link(&mut agent)
            .expect("synthetic modules always link");
        let env = linked
            .module()
            .environment(&agent)
            .expect("linked modules have an environment");
        assert_eq!(
            env.get_binding_value(&mut agent, "default"),
            Ok(Value::Undefined)
        );
        let promise = linked.evaluate(&mut agent);
        assert_eq!(promise.try_get_result(&agent), Some(Ok(Value::Undefined)));
        assert_eq!(
            env.get_binding_value(&mut agent, "default"),
            Ok(Value::from_str("{}"))
        );
        // Evaluation is idempotent.
        assert_eq!(linked.evaluate(&mut agent), promise);
    }

    #[test]
    fn failing_steps_reject_the_evaluation_promise() {
        let mut agent = agent();
        let module = create_synthetic_module(
            &mut agent,
            ["x".into(), "x".into()],
            Box::new(|agent, module| {
                set_synthetic_module_export(agent, module, "y", Value::Null)
            }),
            None,
        );
        assert_eq!(module.export_names(&agent).len(), 1);
        let linked = AbstractModule::from(module).link(&mut agent).unwrap();
        let promise = linked.evaluate(&mut agent);
        let Some(Err(error)) = promise.try_get_result(&agent) else {
            panic!("expected a rejected promise");
        };
        assert!(error.to_string(&agent).starts_with("ReferenceError"));
    }

    #[test]
    fn exports_cannot_be_set_before_linking() {
        let mut agent = agent();
        let module =
            create_synthetic_module(&mut agent, ["x".into()], Box::new(|_, _| Ok(())), None);
        assert!(set_synthetic_module_export(&mut agent, module, "x", Value::Null).is_err());
        assert_eq!(
            AbstractModule::from(module).resolve_export(&agent, "x"),
            ResolveExportResult::Resolved(ResolvedBinding {
                module: module.into(),
                binding_name: ResolvedBindingName::String("x".into()),
            })
        );
        assert_eq!(
            AbstractModule::from(module).resolve_export(&agent, "y"),
            ResolveExportResult::Null
        );
    }
}

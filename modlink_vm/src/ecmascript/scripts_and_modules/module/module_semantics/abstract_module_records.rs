// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.4 Abstract Module Records](https://tc39.es/ecma262/#sec-abstract-module-records)

use std::rc::Rc;

use crate::ecmascript::{
    builtins::{Module, Promise},
    execution::{
        Agent, JsResult, ModuleEnvironment,
        agent::{ExceptionType, JsError},
    },
    scripts_and_modules::HostDefined,
};

use super::{
    cyclic_module_records::{self, CyclicModuleRecordStatus},
    source_text_module_records::SourceTextModule,
    synthetic_module_records::SyntheticModule,
};

/// ### [Module Record Fields](https://tc39.es/ecma262/#table-module-record-fields)
#[derive(Default)]
pub(crate) struct AbstractModuleRecord {
    /// ### \[\[Environment]]
    ///
    /// a Module Environment Record or empty
    ///
    /// The Environment Record containing the top level bindings for this
    /// module. This field is set when the module is linked.
    pub(crate) environment: Option<ModuleEnvironment>,
    /// ### \[\[Namespace]]
    ///
    /// an Object or empty
    ///
    /// The Module Namespace Object (28.3) if one has been created for this
    /// module.
    pub(crate) namespace: Option<Module>,
    /// ### \[\[HostDefined]]
    ///
    /// anything (default value is undefined)
    ///
    /// Field reserved for use by host environments that need to associate
    /// additional information with a module.
    pub(crate) host_defined: Option<HostDefined>,
}

impl AbstractModuleRecord {
    pub(crate) fn new(host_defined: Option<HostDefined>) -> Self {
        Self {
            environment: None,
            namespace: None,
            host_defined,
        }
    }
}

// dyn Any doesn't implement Debug
impl std::fmt::Debug for AbstractModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractModuleRecord")
            .field("environment", &self.environment)
            .field("namespace", &self.namespace)
            .field("host_defined", &self.host_defined.is_some())
            .finish()
    }
}

/// \[\[BindingName]] of a ResolvedBinding Record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBindingName {
    /// The export is the namespace object of \[\[Module]].
    Namespace,
    String(Rc<str>),
}

/// ### [ResolvedBinding Record](https://tc39.es/ecma262/#resolvedbinding-record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// ### \[\[Module]]
    ///
    /// The Module Record that provides the binding.
    pub module: AbstractModule,
    /// ### \[\[BindingName]]
    ///
    /// The name of the binding in the environment of \[\[Module]], or
    /// namespace for a re-exported module namespace.
    pub binding_name: ResolvedBindingName,
}

/// The result of [`AbstractModule::resolve_export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveExportResult {
    Resolved(ResolvedBinding),
    /// No definition was found or the request was found to be circular.
    Null,
    /// The export name resolves to different bindings through two or more
    /// `export *` declarations.
    Ambiguous,
}

/// A Module Record: either a participant in the cyclic linking and
/// evaluation algorithms, or a leaf module whose exports are provided by the
/// host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractModule {
    SourceTextModule(SourceTextModule),
    SyntheticModule(SyntheticModule),
}

impl From<SourceTextModule> for AbstractModule {
    fn from(value: SourceTextModule) -> Self {
        Self::SourceTextModule(value)
    }
}

impl From<SyntheticModule> for AbstractModule {
    fn from(value: SyntheticModule) -> Self {
        Self::SyntheticModule(value)
    }
}

impl AbstractModule {
    /// ### [LoadRequestedModules ( \[ hostDefined \] )](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
    ///
    /// Prepares the module for linking by recursively loading all its
    /// dependencies, and returns a promise.
    pub fn load_requested_modules(
        self,
        agent: &mut Agent,
        host_defined: Option<HostDefined>,
    ) -> Promise {
        match self {
            Self::SourceTextModule(m) => {
                cyclic_module_records::load_requested_modules(agent, m, host_defined)
            }
            Self::SyntheticModule(m) => m.load_requested_modules(agent),
        }
    }

    /// ### [GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
    ///
    /// Returns a list of all names that are either directly or indirectly
    /// exported from this module.
    pub fn get_exported_names(self, agent: &Agent) -> Vec<Rc<str>> {
        self.inner_get_exported_names(agent, &mut vec![])
    }

    pub(super) fn inner_get_exported_names(
        self,
        agent: &Agent,
        export_star_set: &mut Vec<SourceTextModule>,
    ) -> Vec<Rc<str>> {
        match self {
            Self::SourceTextModule(m) => m.get_exported_names(agent, export_star_set),
            Self::SyntheticModule(m) => m.get_exported_names(agent),
        }
    }

    /// ### [ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
    ///
    /// Returns the binding of a name exported by this module. Bindings are
    /// represented by a ResolvedBinding Record. If the export is a Module
    /// Namespace Object without a direct binding in any module, the binding
    /// name is namespace. Returns null if the name cannot be resolved, or
    /// ambiguous if multiple bindings were found.
    ///
    /// Each time this operation is called with a specific exportName,
    /// resolveSet pair as arguments it must return the same result.
    pub fn resolve_export(self, agent: &Agent, export_name: &str) -> ResolveExportResult {
        self.inner_resolve_export(agent, export_name, &mut vec![])
    }

    pub(super) fn inner_resolve_export(
        self,
        agent: &Agent,
        export_name: &str,
        resolve_set: &mut Vec<(SourceTextModule, Rc<str>)>,
    ) -> ResolveExportResult {
        match self {
            Self::SourceTextModule(m) => m.resolve_export(agent, export_name, resolve_set),
            Self::SyntheticModule(m) => m.resolve_export(agent, export_name),
        }
    }

    /// ### [Link ( )](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
    ///
    /// Prepares the module for evaluation by transitively resolving all
    /// module dependencies and creating a Module Environment Record. On
    /// success the returned token can be used to evaluate the module.
    ///
    /// Linking a module whose dependencies have not been loaded, or a module
    /// that is currently being linked or evaluated, is a TypeError.
    pub fn link(self, agent: &mut Agent) -> JsResult<LinkedModule> {
        match self {
            Self::SourceTextModule(m) => {
                match m.status(agent) {
                    CyclicModuleRecordStatus::New => {
                        return Err(agent.throw_exception_with_static_message(
                            ExceptionType::TypeError,
                            "Cannot link a module before its dependencies are loaded.",
                        ));
                    }
                    CyclicModuleRecordStatus::Linking | CyclicModuleRecordStatus::Evaluating => {
                        return Err(agent.throw_exception_with_static_message(
                            ExceptionType::TypeError,
                            "Cannot link a module that is being linked or evaluated.",
                        ));
                    }
                    CyclicModuleRecordStatus::Unlinked
                    | CyclicModuleRecordStatus::Linked
                    | CyclicModuleRecordStatus::EvaluatingAsync
                    | CyclicModuleRecordStatus::Evaluated => {}
                }
                cyclic_module_records::link(agent, m)?;
            }
            Self::SyntheticModule(m) => m.link(agent),
        }
        Ok(LinkedModule(self))
    }

    /// \[\[Status]] of a Cyclic Module Record, or None for other modules.
    pub fn status(self, agent: &Agent) -> Option<CyclicModuleRecordStatus> {
        match self {
            Self::SourceTextModule(m) => Some(m.status(agent)),
            Self::SyntheticModule(_) => None,
        }
    }

    /// \[\[EvaluationError]] of a Cyclic Module Record.
    pub fn evaluation_error(self, agent: &Agent) -> Option<JsError> {
        match self {
            Self::SourceTextModule(m) => m.evaluation_error(agent),
            Self::SyntheticModule(_) => None,
        }
    }

    /// \[\[CycleRoot]] of a Cyclic Module Record.
    pub fn cycle_root(self, agent: &Agent) -> Option<SourceTextModule> {
        match self {
            Self::SourceTextModule(m) => m.cycle_root(agent),
            Self::SyntheticModule(_) => None,
        }
    }

    /// \[\[Environment]]
    pub fn environment(self, agent: &Agent) -> Option<ModuleEnvironment> {
        self.abstract_fields(agent).environment
    }

    /// \[\[Namespace]]
    pub fn namespace(self, agent: &Agent) -> Option<Module> {
        self.abstract_fields(agent).namespace
    }

    pub(crate) fn set_namespace(self, agent: &mut Agent, namespace: Module) {
        self.abstract_fields_mut(agent).namespace = Some(namespace);
    }

    /// \[\[HostDefined]]
    pub fn host_defined(self, agent: &Agent) -> Option<HostDefined> {
        self.abstract_fields(agent).host_defined.clone()
    }

    fn abstract_fields(self, agent: &Agent) -> &AbstractModuleRecord {
        match self {
            Self::SourceTextModule(m) => &agent[m].abstract_fields,
            Self::SyntheticModule(m) => &agent[m].abstract_fields,
        }
    }

    fn abstract_fields_mut(self, agent: &mut Agent) -> &mut AbstractModuleRecord {
        match self {
            Self::SourceTextModule(m) => &mut agent[m].abstract_fields,
            Self::SyntheticModule(m) => &mut agent[m].abstract_fields,
        }
    }
}

/// A module that has been successfully linked.
///
/// Only linked modules can be evaluated: the token is handed out by
/// [`AbstractModule::link`] and a module never returns to an unlinked state
/// once linking succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkedModule(AbstractModule);

impl LinkedModule {
    pub fn module(self) -> AbstractModule {
        self.0
    }

    /// ### [Evaluate ( )](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
    ///
    /// Returns a promise for the evaluation of this module and its
    /// dependencies, resolving on successful evaluation or if it has already
    /// been evaluated successfully, and rejecting for an evaluation error or
    /// if it has already been evaluated unsuccessfully. If the promise is
    /// rejected, hosts are expected to handle the promise rejection and
    /// rethrow the evaluation error.
    pub fn evaluate(self, agent: &mut Agent) -> Promise {
        match self.0 {
            AbstractModule::SourceTextModule(m) => {
                if !matches!(
                    m.status(agent),
                    CyclicModuleRecordStatus::Linked
                        | CyclicModuleRecordStatus::EvaluatingAsync
                        | CyclicModuleRecordStatus::Evaluated
                ) {
                    // Evaluate was called from within the evaluation of this
                    // module's own graph.
                    let error = agent.create_exception_with_static_message(
                        ExceptionType::TypeError,
                        "Cannot evaluate a module that is being evaluated.",
                    );
                    return Promise::new_rejected(agent, error);
                }
                cyclic_module_records::evaluate(agent, m)
            }
            AbstractModule::SyntheticModule(m) => m.evaluate(agent),
        }
    }
}

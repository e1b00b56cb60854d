// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records)

use std::{
    ops::{Index, IndexMut},
    rc::Rc,
};

use oxc_allocator::Allocator;
use oxc_ast::ast::{self, Program};
use oxc_ast_visit::{Visit, walk};
use oxc_diagnostics::OxcDiagnostic;
use oxc_ecmascript::BoundNames;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::{SemanticBuilder, SemanticBuilderReturn};
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;

use crate::{
    ecmascript::{
        builtins::control_abstraction_objects::{
            async_function_objects::await_reaction::async_block_start,
            promise_objects::promise_abstract_operations::promise_capability_records::PromiseCapability,
        },
        execution::{
            Agent, JsResult, ModuleEnvironment,
            agent::{ExceptionType, JsError},
            environments::new_module_environment,
        },
        scripts_and_modules::HostDefined,
        types::Value,
    },
    engine::{ModuleBody, ModuleBodyStep},
    heap::{CreateHeapData, Heap, indexes::BaseIndex},
};

use super::{
    ImportAttributeRecord, ImportPhase, LoadedModuleRequestRecord, ModuleRequestRecord,
    ResolveExportResult, ResolvedBinding, ResolvedBindingName,
    abstract_module_records::{AbstractModule, AbstractModuleRecord},
    cyclic_module_records::{
        CyclicModuleAbstractMethods, CyclicModuleRecord, CyclicModuleRecordStatus,
    },
    get_imported_module, get_module_namespace, module_requests_equal,
};

/// Bound name of the anonymous default export.
const DEFAULT_BINDING_NAME: &str = "*default*";

pub struct SourceTextModuleRecord {
    /// [Module Record Fields](https://tc39.es/ecma262/#table-module-record-fields)
    pub(crate) abstract_fields: AbstractModuleRecord,
    /// [Cyclic Module Record Fields](https://tc39.es/ecma262/#table-cyclic-module-fields)
    pub(crate) cyclic_fields: CyclicModuleRecord,
    /// ### \[\[ECMAScriptCode]]
    ///
    /// The executable body of this module. Taken when the body first runs.
    ecmascript_code: Option<Box<dyn ModuleBody>>,
    /// ### \[\[ImportEntries]]
    ///
    /// A List of ImportEntry records derived from the code of this module.
    import_entries: Box<[ImportEntryRecord]>,
    /// ### \[\[LocalExportEntries]]
    ///
    /// A List of ExportEntry records derived from the code of this module that
    /// correspond to declarations that occur within the module.
    local_export_entries: Box<[LocalExportEntryRecord]>,
    /// ### \[\[IndirectExportEntries]]
    ///
    /// A List of ExportEntry records derived from the code of this module that
    /// correspond to reexported imports that occur within the module or
    /// exports from `export * as namespace` declarations.
    indirect_export_entries: Box<[IndirectExportEntryRecord]>,
    /// ### \[\[StarExportEntries]]
    ///
    /// A List of ExportEntry records derived from the code of this module that
    /// correspond to `export *` declarations that occur within the module,
    /// not including `export * as namespace` declarations.
    star_export_entries: Box<[ModuleRequestRecord]>,
    /// VarDeclaredNames of the module body, including hoisted function
    /// declarations.
    var_names: Box<[Rc<str>]>,
    /// LexicallyDeclaredNames of the module body paired with
    /// IsConstantDeclaration.
    lexical_declarations: Box<[(Rc<str>, bool)]>,
}

// dyn ModuleBody doesn't implement Debug
impl std::fmt::Debug for SourceTextModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTextModuleRecord")
            .field("abstract_fields", &self.abstract_fields)
            .field("cyclic_fields", &self.cyclic_fields)
            .field("ecmascript_code", &self.ecmascript_code.is_some())
            .field("import_entries", &self.import_entries)
            .field("local_export_entries", &self.local_export_entries)
            .field("indirect_export_entries", &self.indirect_export_entries)
            .field("star_export_entries", &self.star_export_entries)
            .finish()
    }
}

/// ### [ImportEntry Record Fields](https://tc39.es/ecma262/#table-importentry-record-fields)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntryRecord {
    /// ### \[\[ModuleRequest]]
    ///
    /// ModuleRequest Record representing the ModuleSpecifier and import
    /// attributes of the ImportDeclaration.
    pub module_request: ModuleRequestRecord,
    /// ### \[\[ImportName]]
    ///
    /// The name under which the desired binding is exported by the module
    /// identified by \[\[ModuleRequest]]. None means that the import request
    /// is for the target module's namespace object.
    pub import_name: Option<Rc<str>>,
    /// ### \[\[LocalName]]
    ///
    /// The name that is used to locally access the imported value from within
    /// the importing module.
    pub local_name: Rc<str>,
}

/// ## [ExportEntry Record Fields](https://tc39.es/ecma262/#table-exportentry-records)
///
/// Local export declarations.
///
/// ```javascript
/// export { x };
/// export var x;
/// export function x() {}
/// export default 42;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExportEntryRecord {
    /// ### \[\[ExportName]]
    pub export_name: Rc<str>,
    /// ### \[\[LocalName]]
    pub local_name: Rc<str>,
}

/// ## [ExportEntry Record Fields](https://tc39.es/ecma262/#table-exportentry-records)
///
/// Re-export declarations.
///
/// ```javascript
/// export * as ns from "mod";
/// export { x } from "mod";
/// export { v as x } from "mod";
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectExportEntryRecord {
    /// ### \[\[ExportName]]
    pub export_name: Rc<str>,
    /// ### \[\[ModuleRequest]]
    pub module_request: ModuleRequestRecord,
    /// ### \[\[ImportName]]
    ///
    /// None is used for `export * as ns from "mod"` declarations.
    pub import_name: Option<Rc<str>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SourceTextModule(BaseIndex<SourceTextModuleRecord>);

impl SourceTextModule {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// ### \[\[Status]]
    pub fn status(self, agent: &Agent) -> CyclicModuleRecordStatus {
        agent[self].cyclic_fields.status()
    }

    /// ### \[\[EvaluationError]]
    pub fn evaluation_error(self, agent: &Agent) -> Option<JsError> {
        agent[self].cyclic_fields.evaluation_error().cloned()
    }

    /// ### \[\[CycleRoot]]
    pub fn cycle_root(self, agent: &Agent) -> Option<SourceTextModule> {
        agent[self].cyclic_fields.cycle_root()
    }

    /// ### \[\[HasTLA]]
    pub fn has_tla(self, agent: &Agent) -> bool {
        agent[self].cyclic_fields.has_tla()
    }

    /// ### \[\[DFSIndex]]
    pub fn dfs_index(self, agent: &Agent) -> Option<u32> {
        agent[self].cyclic_fields.dfs_index()
    }

    /// ### \[\[DFSAncestorIndex]]
    pub fn dfs_ancestor_index(self, agent: &Agent) -> Option<u32> {
        agent[self].cyclic_fields.dfs_ancestor_index()
    }

    /// ### \[\[RequestedModules]]
    pub fn requested_modules(self, agent: &Agent) -> Rc<[ModuleRequestRecord]> {
        agent[self].cyclic_fields.requested_modules()
    }

    /// ### \[\[LoadedModules]]
    pub fn loaded_modules(
        self,
        agent: &Agent,
    ) -> impl Iterator<Item = (&ModuleRequestRecord, AbstractModule)> {
        agent[self]
            .cyclic_fields
            .loaded_modules()
            .iter()
            .map(|record| (&record.request, record.module))
    }

    /// Returns the loaded module for the request, if any.
    pub fn get_loaded_module(
        self,
        agent: &Agent,
        request: &ModuleRequestRecord,
    ) -> Option<AbstractModule> {
        agent[self]
            .cyclic_fields
            .loaded_modules()
            .iter()
            .find(|record| module_requests_equal(&record.request, request))
            .map(|record| record.module)
    }

    pub(super) fn insert_loaded_module(
        self,
        agent: &mut Agent,
        request: &ModuleRequestRecord,
        module: AbstractModule,
    ) {
        if let Some(loaded) = self.get_loaded_module(agent, request) {
            // i. Assert: record.[[Module]] and result.[[Value]] are the same
            //    Module Record.
            debug_assert_eq!(
                loaded, module,
                "Host loaded two different modules for the same request"
            );
            return;
        }
        agent[self]
            .cyclic_fields
            .push_loaded_module(LoadedModuleRequestRecord {
                request: request.clone(),
                module,
            });
    }

    /// ### \[\[Environment]]
    pub fn environment(self, agent: &Agent) -> Option<ModuleEnvironment> {
        agent[self].abstract_fields.environment
    }

    /// ### \[\[HostDefined]]
    pub fn host_defined(self, agent: &Agent) -> Option<HostDefined> {
        agent[self].abstract_fields.host_defined.clone()
    }

    /// ### \[\[ImportEntries]]
    pub fn import_entries(self, agent: &Agent) -> &[ImportEntryRecord] {
        &agent[self].import_entries
    }

    /// ### \[\[LocalExportEntries]]
    pub fn local_export_entries(self, agent: &Agent) -> &[LocalExportEntryRecord] {
        &agent[self].local_export_entries
    }

    /// ### \[\[IndirectExportEntries]]
    pub fn indirect_export_entries(self, agent: &Agent) -> &[IndirectExportEntryRecord] {
        &agent[self].indirect_export_entries
    }

    /// ### \[\[StarExportEntries]]
    pub fn star_export_entries(self, agent: &Agent) -> &[ModuleRequestRecord] {
        &agent[self].star_export_entries
    }

    /// ### [16.2.1.7.2.1 GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#sec-getexportednames)
    ///
    /// The GetExportedNames concrete method of a Source Text Module Record
    /// module takes optional argument exportStarSet (a List of Source Text
    /// Module Records) and returns a List of Strings.
    ///
    /// > NOTE: GetExportedNames does not filter out or throw an exception for
    /// > names that have ambiguous star export bindings.
    pub(super) fn get_exported_names(
        self,
        agent: &Agent,
        export_star_set: &mut Vec<SourceTextModule>,
    ) -> Vec<Rc<str>> {
        let module = self;
        // 1. Assert: module.[[Status]] is not new.
        debug_assert_ne!(module.status(agent), CyclicModuleRecordStatus::New);
        // 2. If exportStarSet is not present, set exportStarSet to a new empty
        //    List.
        // 3. If exportStarSet contains module, then
        if export_star_set.contains(&module) {
            // a. Assert: We've reached the starting point of an export *
            //    circularity.
            // b. Return a new empty List.
            return vec![];
        }
        // 4. Append module to exportStarSet.
        export_star_set.push(module);
        // 5. Let exportedNames be a new empty List.
        let mut exported_names: Vec<Rc<str>> = vec![];
        // 6. For each ExportEntry Record e of module.[[LocalExportEntries]], do
        for e in module.local_export_entries(agent) {
            // a. Assert: module provides the direct binding for this export.
            // b. Assert: e.[[ExportName]] is not null.
            // c. Append e.[[ExportName]] to exportedNames.
            exported_names.push(e.export_name.clone());
        }
        // 7. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
        for e in module.indirect_export_entries(agent) {
            // a. Assert: module imports a specific binding for this export.
            // b. Assert: e.[[ExportName]] is not null.
            // c. Append e.[[ExportName]] to exportedNames.
            exported_names.push(e.export_name.clone());
        }
        // 8. For each ExportEntry Record e of module.[[StarExportEntries]], do
        for e in module.star_export_entries(agent) {
            // a. Assert: e.[[ModuleRequest]] is not null.
            // b. Let requestedModule be GetImportedModule(module, e.[[ModuleRequest]]).
            let requested_module = get_imported_module(agent, module, e);
            // c. Let starNames be requestedModule.GetExportedNames(exportStarSet).
            let star_names = requested_module.inner_get_exported_names(agent, export_star_set);
            // d. For each element n of starNames, do
            for n in star_names {
                // i. If n is not "default", then
                // 1. If exportedNames does not contain n, then
                if &*n != "default" && !exported_names.contains(&n) {
                    // a. Append n to exportedNames.
                    exported_names.push(n);
                }
            }
        }
        // 9. Return exportedNames.
        exported_names
    }

    /// ### [16.2.1.7.2.2 ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#sec-resolveexport)
    ///
    /// The ResolveExport concrete method of a Source Text Module Record module
    /// takes argument exportName (a String) and optional argument resolveSet
    /// (a List of Records with fields \[\[Module]] (a Module Record) and
    /// \[\[ExportName]] (a String)) and returns a ResolvedBinding Record,
    /// null, or ambiguous.
    ///
    /// ResolveExport attempts to resolve an imported binding to the actual
    /// defining module and local binding name. The defining module may be the
    /// module represented by the Module Record this method was invoked on or
    /// some other module that is imported by that module. The parameter
    /// resolveSet is used to detect unresolved circular import/export paths.
    /// If a pair consisting of specific Module Record and exportName is
    /// reached that is already in resolveSet, an import circularity has been
    /// encountered. Before recursively calling ResolveExport, a pair
    /// consisting of module and exportName is added to resolveSet.
    pub(super) fn resolve_export(
        self,
        agent: &Agent,
        export_name: &str,
        resolve_set: &mut Vec<(SourceTextModule, Rc<str>)>,
    ) -> ResolveExportResult {
        let module = self;
        // 1. Assert: module.[[Status]] is not new.
        debug_assert_ne!(module.status(agent), CyclicModuleRecordStatus::New);
        // 2. If resolveSet is not present, set resolveSet to a new empty List.
        // 3. For each Record { [[Module]], [[ExportName]] } r of resolveSet, do
        //     a. If module and r.[[Module]] are the same Module Record and
        //        exportName is r.[[ExportName]], then
        if resolve_set
            .iter()
            .any(|(m, name)| *m == module && &**name == export_name)
        {
            // i. Assert: This is a circular import request.
            // ii. Return null.
            return ResolveExportResult::Null;
        }
        // 4. Append the Record { [[Module]]: module, [[ExportName]]: exportName } to resolveSet.
        resolve_set.push((module, export_name.into()));
        // 5. For each ExportEntry Record e of module.[[LocalExportEntries]], do
        for e in module.local_export_entries(agent) {
            // a. If e.[[ExportName]] is exportName, then
            if &*e.export_name == export_name {
                // i. Assert: module provides the direct binding for this export.
                // ii. Return ResolvedBinding Record { [[Module]]: module,
                //     [[BindingName]]: e.[[LocalName]] }.
                return ResolveExportResult::Resolved(ResolvedBinding {
                    module: module.into(),
                    binding_name: ResolvedBindingName::String(e.local_name.clone()),
                });
            }
        }
        // 6. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
        for e in module.indirect_export_entries(agent) {
            // a. If e.[[ExportName]] is exportName, then
            if &*e.export_name == export_name {
                // i. Assert: e.[[ModuleRequest]] is not null.
                // ii. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
                let imported_module = get_imported_module(agent, module, &e.module_request);
                return match &e.import_name {
                    // iii. If e.[[ImportName]] is all, then
                    None => {
                        // 1. Assert: module does not provide the direct binding for this export.
                        // 2. Return ResolvedBinding Record { [[Module]]:
                        //    importedModule, [[BindingName]]: namespace }.
                        ResolveExportResult::Resolved(ResolvedBinding {
                            module: imported_module,
                            binding_name: ResolvedBindingName::Namespace,
                        })
                    }
                    // iv. Else,
                    Some(import_name) => {
                        // 1. Assert: module imports a specific binding for this export.
                        // 2. Assert: e.[[ImportName]] is a String.
                        // 3. Return importedModule.ResolveExport(e.[[ImportName]], resolveSet).
                        imported_module.inner_resolve_export(agent, import_name, resolve_set)
                    }
                };
            }
        }
        // 7. If exportName is "default", then
        if export_name == "default" {
            // a. Assert: A default export was not explicitly defined by this
            //    module.
            // b. Return null.
            // c. NOTE: A default export cannot be provided by an export * from
            //    "mod" declaration.
            return ResolveExportResult::Null;
        }
        // 8. Let starResolution be null.
        let mut star_resolution: Option<ResolvedBinding> = None;
        // 9. For each ExportEntry Record e of module.[[StarExportEntries]], do
        for e in module.star_export_entries(agent) {
            // a. Assert: e.[[ModuleRequest]] is not null.
            // b. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
            let imported_module = get_imported_module(agent, module, e);
            // c. Let resolution be importedModule.ResolveExport(exportName, resolveSet).
            let resolution = imported_module.inner_resolve_export(agent, export_name, resolve_set);
            let resolution = match resolution {
                // d. If resolution is ambiguous, return ambiguous.
                ResolveExportResult::Ambiguous => return ResolveExportResult::Ambiguous,
                // e. If resolution is not null, then
                ResolveExportResult::Null => continue,
                // i. Assert: resolution is a ResolvedBinding Record.
                ResolveExportResult::Resolved(resolution) => resolution,
            };
            match &star_resolution {
                // ii. If starResolution is null, then
                None => {
                    // 1. Set starResolution to resolution.
                    star_resolution = Some(resolution);
                }
                // iii. Else,
                Some(star) => {
                    // 1. Assert: There is more than one * import that includes
                    //    the requested name.
                    // 2. If resolution.[[Module]] and starResolution.[[Module]]
                    //    are not the same Module Record, return ambiguous.
                    if resolution.module != star.module {
                        return ResolveExportResult::Ambiguous;
                    }
                    // 3. If resolution.[[BindingName]] is not
                    //    starResolution.[[BindingName]] and either
                    //    resolution.[[BindingName]] or
                    //    starResolution.[[BindingName]] is namespace, return
                    //    ambiguous.
                    // 4. If resolution.[[BindingName]] is a String,
                    //    starResolution.[[BindingName]] is a String, and
                    //    resolution.[[BindingName]] is not
                    //    starResolution.[[BindingName]], return ambiguous.
                    if resolution.binding_name != star.binding_name {
                        return ResolveExportResult::Ambiguous;
                    }
                }
            }
        }
        // 10. Return starResolution.
        match star_resolution {
            Some(resolution) => ResolveExportResult::Resolved(resolution),
            None => ResolveExportResult::Null,
        }
    }
}

fn unresolvable_import_error(
    agent: &mut Agent,
    specifier: &str,
    name: &str,
    resolution: &ResolveExportResult,
) -> JsError {
    let message = if matches!(resolution, ResolveExportResult::Ambiguous) {
        format!("The requested module '{specifier}' contains conflicting star exports for name '{name}'")
    } else {
        format!("The requested module '{specifier}' does not provide an export named '{name}'")
    };
    agent.throw_exception(ExceptionType::SyntaxError, message)
}

impl CyclicModuleAbstractMethods for SourceTextModule {
    /// ### [16.2.1.7.3.1 InitializeEnvironment ( )](https://tc39.es/ecma262/#sec-source-text-module-record-initialize-environment)
    ///
    /// The InitializeEnvironment concrete method of a Source Text Module
    /// Record module takes no arguments and returns either a normal
    /// completion containing unused or a throw completion.
    fn initialize_environment(self, agent: &mut Agent) -> JsResult<()> {
        let module = self;
        // 1. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
        let indirect_export_entries = agent[module].indirect_export_entries.clone();
        for e in indirect_export_entries.iter() {
            // a. Assert: e.[[ExportName]] is not null.
            // b. Let resolution be module.ResolveExport(e.[[ExportName]]).
            let resolution = module.resolve_export(agent, &e.export_name, &mut vec![]);
            // c. If resolution is either null or ambiguous, throw a SyntaxError exception.
            if !matches!(resolution, ResolveExportResult::Resolved(_)) {
                let name = e.import_name.as_ref().unwrap_or(&e.export_name);
                return Err(unresolvable_import_error(
                    agent,
                    e.module_request.specifier(),
                    name,
                    &resolution,
                ));
            }
            // d. Assert: resolution is a ResolvedBinding Record.
        }
        // 2. Assert: All named exports from module are resolvable.
        // 3. Let realm be module.[[Realm]].
        // 4. Assert: realm is not undefined.
        // 5. Let env be NewModuleEnvironment(realm.[[GlobalEnv]]).
        let env = new_module_environment(agent);
        // 6. Set module.[[Environment]] to env.
        agent[module].abstract_fields.environment = Some(env);
        // 7. For each ImportEntry Record in of module.[[ImportEntries]], do
        let import_entries = agent[module].import_entries.clone();
        for r#in in import_entries.iter() {
            // a. Let importedModule be GetImportedModule(module, in.[[ModuleRequest]]).
            let imported_module = get_imported_module(agent, module, &r#in.module_request);
            // b. If in.[[ImportName]] is namespace-object, then
            let Some(import_name) = &r#in.import_name else {
                // i. Let namespace be GetModuleNamespace(importedModule).
                let namespace = get_module_namespace(agent, imported_module);
                // ii. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                env.create_immutable_binding(agent, &r#in.local_name);
                // iii. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                env.initialize_binding(agent, &r#in.local_name, namespace.into());
                continue;
            };
            // c. Else,
            // i. Let resolution be importedModule.ResolveExport(in.[[ImportName]]).
            let resolution = imported_module.resolve_export(agent, import_name);
            // ii. If resolution is either null or ambiguous, throw a SyntaxError exception.
            let ResolveExportResult::Resolved(ResolvedBinding {
                module: resolved_module,
                binding_name,
            }) = resolution
            else {
                return Err(unresolvable_import_error(
                    agent,
                    r#in.module_request.specifier(),
                    import_name,
                    &resolution,
                ));
            };
            match binding_name {
                // iii. If resolution.[[BindingName]] is namespace, then
                ResolvedBindingName::Namespace => {
                    // 1. Let namespace be GetModuleNamespace(resolution.[[Module]]).
                    let namespace = get_module_namespace(agent, resolved_module);
                    // 2. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                    env.create_immutable_binding(agent, &r#in.local_name);
                    // 3. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                    env.initialize_binding(agent, &r#in.local_name, namespace.into());
                }
                // iv. Else,
                ResolvedBindingName::String(binding_name) => {
                    // 1. Perform CreateImportBinding(env, in.[[LocalName]],
                    //    resolution.[[Module]], resolution.[[BindingName]]).
                    env.create_import_binding(
                        agent,
                        &r#in.local_name,
                        resolved_module,
                        binding_name,
                    );
                }
            }
        }
        // 19. Let varDeclarations be the VarScopedDeclarations of code.
        // 20. Let declaredVarNames be a new empty List.
        // 21. For each element d of varDeclarations, do
        //     a. For each element dn of the BoundNames of d, do
        let var_names = agent[module].var_names.clone();
        for dn in var_names.iter() {
            // i. If declaredVarNames does not contain dn, then
            if !env.has_binding(agent, dn) {
                // 1. Perform ! env.CreateMutableBinding(dn, false).
                env.create_mutable_binding(agent, dn);
                // 2. Perform ! env.InitializeBinding(dn, undefined).
                env.initialize_binding(agent, dn, Value::Undefined);
                // 3. Append dn to declaredVarNames.
            }
        }
        // 22. Let lexDeclarations be the LexicallyScopedDeclarations of code.
        // 24. For each element d of lexDeclarations, do
        //     a. For each element dn of the BoundNames of d, do
        let lexical_declarations = agent[module].lexical_declarations.clone();
        for (dn, is_constant) in lexical_declarations.iter() {
            if *is_constant {
                // i. If IsConstantDeclaration of d is true, then
                // 1. Perform ! env.CreateImmutableBinding(dn, true).
                env.create_immutable_binding(agent, dn);
            } else {
                // ii. Else,
                // 1. Perform ! env.CreateMutableBinding(dn, false).
                env.create_mutable_binding(agent, dn);
            }
        }
        // Local exports of names the body never declares still get a binding
        // so that importers can link against them.
        let local_export_entries = agent[module].local_export_entries.clone();
        for e in local_export_entries.iter() {
            if !env.has_binding(agent, &e.local_name) {
                env.create_mutable_binding(agent, &e.local_name);
            }
        }
        // iii. If d is either a FunctionDeclaration, a GeneratorDeclaration,
        //      an AsyncFunctionDeclaration, or an AsyncGeneratorDeclaration,
        //      then
        //      1. Let fo be InstantiateFunctionObject of d with arguments env
        //         and privateEnv.
        //      2. Perform ! env.InitializeBinding(dn, fo).
        if let Some(mut body) = agent[module].ecmascript_code.take() {
            let result = body.instantiate_declarations(agent, module, env);
            agent[module].ecmascript_code = Some(body);
            result?;
        }
        if agent.options.print_internals {
            eprintln!(
                "Initialized environment of {module:?} with bindings {:?}",
                env.binding_names(agent)
            );
        }
        // 26. Return unused.
        Ok(())
    }

    /// ### [16.2.1.7.3.2 ExecuteModule ( \[ capability \] )](https://tc39.es/ecma262/#sec-source-text-module-record-execute-module)
    ///
    /// The ExecuteModule concrete method of a Source Text Module Record module
    /// takes optional argument capability (a PromiseCapability Record) and
    /// returns either a normal completion containing unused or a throw
    /// completion.
    fn execute_module(
        self,
        agent: &mut Agent,
        capability: Option<PromiseCapability>,
    ) -> JsResult<()> {
        let module = self;
        // 5. Assert: module has been linked and declarations in its module
        //    environment have been instantiated.
        debug_assert!(module.environment(agent).is_some());
        let Some(mut body) = agent[module].ecmascript_code.take() else {
            return Err(agent.throw_exception_with_static_message(
                ExceptionType::TypeError,
                "Module body has already been executed.",
            ));
        };
        if agent.options.print_internals {
            eprintln!("Executing {module:?}");
        }
        // 8. Suspend the running execution context.
        // 9. If module.[[HasTLA]] is false, then
        let Some(capability) = capability else {
            // a. Assert: capability is not present.
            debug_assert!(!module.has_tla(agent));
            // b. Push moduleContext onto the execution context stack;
            //    moduleContext is now the running execution context.
            // c. Let result be Completion(Evaluation of
            //    module.[[ECMAScriptCode]]).
            // d. Suspend moduleContext and remove it from the execution
            //    context stack.
            // e. Resume the context that is now on the top of the execution
            //    context stack as the running execution context.
            // f. If result is an abrupt completion, then
            //     i. Return ? result.
            return match body.resume(agent, module, Ok(Value::Undefined)) {
                ModuleBodyStep::Return(_) => Ok(()),
                ModuleBodyStep::Throw(error) => Err(error),
                ModuleBodyStep::Await(_) => Err(agent.throw_exception_with_static_message(
                    ExceptionType::TypeError,
                    "await is only valid in modules with top-level await",
                )),
            };
        };
        // 10. Else,
        // a. Assert: capability is a PromiseCapability Record.
        debug_assert!(module.has_tla(agent));
        // b. Perform AsyncBlockStart(capability, module.[[ECMAScriptCode]],
        //    moduleContext).
        async_block_start(agent, module, body, capability, Ok(Value::Undefined));
        // 11. Return unused.
        Ok(())
    }
}

impl Index<SourceTextModule> for Agent {
    type Output = SourceTextModuleRecord;

    fn index(&self, index: SourceTextModule) -> &Self::Output {
        &self.heap.source_text_module_records[index]
    }
}

impl IndexMut<SourceTextModule> for Agent {
    fn index_mut(&mut self, index: SourceTextModule) -> &mut Self::Output {
        &mut self.heap.source_text_module_records[index]
    }
}

impl Index<SourceTextModule> for Vec<SourceTextModuleRecord> {
    type Output = SourceTextModuleRecord;

    fn index(&self, index: SourceTextModule) -> &Self::Output {
        self.get(index.get_index())
            .expect("SourceTextModule out of bounds")
    }
}

impl IndexMut<SourceTextModule> for Vec<SourceTextModuleRecord> {
    fn index_mut(&mut self, index: SourceTextModule) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("SourceTextModule out of bounds")
    }
}

impl CreateHeapData<SourceTextModuleRecord, SourceTextModule> for Heap {
    fn create(&mut self, data: SourceTextModuleRecord) -> SourceTextModule {
        self.source_text_module_records.push(data);
        SourceTextModule(BaseIndex::last(&self.source_text_module_records))
    }
}

pub type ModuleOrErrors = Result<SourceTextModule, Vec<OxcDiagnostic>>;

/// ### [16.2.1.7.1 ParseModule ( sourceText, realm, hostDefined )](https://tc39.es/ecma262/#sec-parsemodule)
///
/// Parses the source text and creates a Source Text Module Record in status
/// new. The `compile` callback receives the parsed program and returns the
/// body that runs when the module is evaluated.
pub fn parse_module(
    agent: &mut Agent,
    source_text: &str,
    host_defined: Option<HostDefined>,
    compile: impl FnOnce(&Program<'_>) -> Box<dyn ModuleBody>,
) -> ModuleOrErrors {
    // 1. Let body be ParseText(sourceText, Module).
    let source_type = if cfg!(feature = "typescript") {
        SourceType::default()
            .with_module(true)
            .with_typescript(true)
    } else {
        SourceType::default().with_module(true)
    };
    let allocator = Allocator::default();
    let ParserReturn {
        errors, program, ..
    } = Parser::new(&allocator, source_text, source_type).parse();
    // 2. If body is a List of errors, return body.
    if !errors.is_empty() {
        return Err(errors);
    }
    let SemanticBuilderReturn { errors, .. } = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&program);
    if !errors.is_empty() {
        return Err(errors);
    }

    // 3. Let requestedModules be the ModuleRequests of body.
    let mut requested_modules: Vec<ModuleRequestRecord> = vec![];
    // 4. Let importEntries be the ImportEntries of body.
    let mut import_entries: Vec<ImportEntryRecord> = vec![];
    for ee in program.body.iter() {
        let Some(ee) = ee.as_module_declaration() else {
            continue;
        };
        match ee {
            ast::ModuleDeclaration::ImportDeclaration(ee) => {
                #[cfg(feature = "typescript")]
                if ee.import_kind.is_type() {
                    continue;
                }
                let module_request =
                    module_request_record(&ee.source, ee.with_clause.as_deref(), ee.phase);
                push_module_request(&mut requested_modules, &module_request);
                let Some(specifiers) = &ee.specifiers else {
                    continue;
                };
                for specifier in specifiers {
                    let (import_name, local_name): (Option<Rc<str>>, Rc<str>) = match specifier {
                        ast::ImportDeclarationSpecifier::ImportSpecifier(specifier) => {
                            #[cfg(feature = "typescript")]
                            if specifier.import_kind.is_type() {
                                continue;
                            }
                            (
                                Some(specifier.imported.name().as_str().into()),
                                specifier.local.name.as_str().into(),
                            )
                        }
                        ast::ImportDeclarationSpecifier::ImportDefaultSpecifier(specifier) => {
                            (Some("default".into()), specifier.local.name.as_str().into())
                        }
                        ast::ImportDeclarationSpecifier::ImportNamespaceSpecifier(specifier) => {
                            (None, specifier.local.name.as_str().into())
                        }
                    };
                    import_entries.push(ImportEntryRecord {
                        module_request: module_request.clone(),
                        import_name,
                        local_name,
                    });
                }
            }
            ast::ModuleDeclaration::ExportNamedDeclaration(ee) => {
                if ee.is_typescript_syntax() {
                    continue;
                }
                if let Some(source) = &ee.source {
                    let module_request =
                        module_request_record(source, ee.with_clause.as_deref(), None);
                    push_module_request(&mut requested_modules, &module_request);
                }
            }
            ast::ModuleDeclaration::ExportAllDeclaration(ee) => {
                if ee.is_typescript_syntax() {
                    continue;
                }
                let module_request =
                    module_request_record(&ee.source, ee.with_clause.as_deref(), None);
                push_module_request(&mut requested_modules, &module_request);
            }
            _ => {}
        }
    }
    // 5. Let importedBoundNames be ImportedLocalNames(importEntries).
    // 6. Let indirectExportEntries be a new empty List.
    let mut indirect_export_entries = vec![];
    // 7. Let localExportEntries be a new empty List.
    let mut local_export_entries = vec![];
    // 8. Let starExportEntries be a new empty List.
    let mut star_export_entries = vec![];
    // 9. Let exportEntries be the ExportEntries of body.
    // 10. For each ExportEntry Record ee of exportEntries, do
    for ee in program.body.iter() {
        let Some(ee) = ee.as_module_declaration() else {
            continue;
        };
        match ee {
            ast::ModuleDeclaration::ExportDefaultDeclaration(ee) => {
                // ExportDeclaration : export default HoistableDeclaration
                // ExportDeclaration : export default ClassDeclaration
                // ExportDeclaration : export default AssignmentExpression ;
                let local_name: Rc<str> = match &ee.declaration {
                    ast::ExportDefaultDeclarationKind::FunctionDeclaration(f) => f
                        .id
                        .as_ref()
                        .map_or(DEFAULT_BINDING_NAME, |id| id.name.as_str())
                        .into(),
                    ast::ExportDefaultDeclarationKind::ClassDeclaration(c) => c
                        .id
                        .as_ref()
                        .map_or(DEFAULT_BINDING_NAME, |id| id.name.as_str())
                        .into(),
                    ast::ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => continue,
                    _ => DEFAULT_BINDING_NAME.into(),
                };
                // a. If ee.[[ModuleRequest]] is null, then
                // i. If importedBoundNames does not contain ee.[[LocalName]], then
                // 1. Append ee to localExportEntries.
                local_export_entries.push(LocalExportEntryRecord {
                    export_name: "default".into(),
                    local_name,
                });
            }
            ast::ModuleDeclaration::ExportNamedDeclaration(ee) => {
                if ee.is_typescript_syntax() {
                    continue;
                }
                if let Some(source) = &ee.source {
                    // export { a, b as c } from "source";
                    let module_request =
                        module_request_record(source, ee.with_clause.as_deref(), None);
                    for entry in ee.specifiers.iter() {
                        #[cfg(feature = "typescript")]
                        if entry.export_kind.is_type() {
                            continue;
                        }
                        // b. Else if ee.[[ImportName]] is all-but-default, then
                        // c. Else,
                        // i. Append ee to indirectExportEntries.
                        indirect_export_entries.push(IndirectExportEntryRecord {
                            export_name: entry.exported.name().as_str().into(),
                            module_request: module_request.clone(),
                            import_name: Some(entry.local.name().as_str().into()),
                        });
                    }
                } else if let Some(decl) = &ee.declaration {
                    // export var d;
                    // export function g() {}
                    decl.bound_names(&mut |name| {
                        let name: Rc<str> = name.name.as_str().into();
                        local_export_entries.push(LocalExportEntryRecord {
                            export_name: name.clone(),
                            local_name: name,
                        });
                    });
                } else {
                    // export { a, b as c };
                    for entry in ee.specifiers.iter() {
                        #[cfg(feature = "typescript")]
                        if entry.export_kind.is_type() {
                            continue;
                        }
                        let local_name = entry.local.name();
                        let export_name: Rc<str> = entry.exported.name().as_str().into();
                        // i. If importedBoundNames does not contain ee.[[LocalName]], then
                        let ie = import_entries
                            .iter()
                            .find(|ie| &*ie.local_name == local_name.as_str());
                        match ie {
                            // ii. Else,
                            // 1. Let ie be the element of importEntries whose
                            //    [[LocalName]] is ee.[[LocalName]].
                            // 2. If ie.[[ImportName]] is namespace-object, then
                            //     a. NOTE: This is a re-export of an imported
                            //        module namespace object.
                            //     b. Append ee to localExportEntries.
                            Some(ie) if ie.import_name.is_some() => {
                                // 3. Else,
                                // a. NOTE: This is a re-export of a single name.
                                // b. Append the ExportEntry Record {
                                //    [[ModuleRequest]]: ie.[[ModuleRequest]],
                                //    [[ImportName]]: ie.[[ImportName]],
                                //    [[LocalName]]: null, [[ExportName]]:
                                //    ee.[[ExportName]] } to
                                //    indirectExportEntries.
                                indirect_export_entries.push(IndirectExportEntryRecord {
                                    export_name,
                                    module_request: ie.module_request.clone(),
                                    import_name: ie.import_name.clone(),
                                });
                            }
                            _ => {
                                // 1. Append ee to localExportEntries.
                                local_export_entries.push(LocalExportEntryRecord {
                                    export_name,
                                    local_name: local_name.as_str().into(),
                                });
                            }
                        }
                    }
                }
            }
            ast::ModuleDeclaration::ExportAllDeclaration(ee) => {
                if ee.is_typescript_syntax() {
                    continue;
                }
                let module_request =
                    module_request_record(&ee.source, ee.with_clause.as_deref(), None);
                if let Some(exported) = &ee.exported {
                    // c. Else,
                    // i. Append ee to indirectExportEntries.
                    // export * as ns from "foo";
                    indirect_export_entries.push(IndirectExportEntryRecord {
                        export_name: exported.name().as_str().into(),
                        module_request,
                        import_name: None,
                    });
                } else {
                    // b. Else if ee.[[ImportName]] is all-but-default, then
                    // i. Assert: ee.[[ExportName]] is null.
                    // ii. Append ee to starExportEntries.
                    star_export_entries.push(module_request);
                }
            }
            _ => {}
        }
    }

    // 11. Let async be body Contains await.
    let mut scanner = ModuleBodyScanner::default();
    scanner.visit_program(&program);
    let declarations = top_level_declarations(&program, scanner.var_names);

    let ecmascript_code = compile(&program);

    // 12. Return Source Text Module Record {
    let module = agent.heap.create(SourceTextModuleRecord {
        // [[Realm]]: realm,
        // [[Environment]]: empty,
        // [[Namespace]]: empty,
        // [[HostDefined]]: hostDefined,
        abstract_fields: AbstractModuleRecord::new(host_defined),
        // [[CycleRoot]]: empty,
        // [[HasTLA]]: async,
        // [[AsyncEvaluationOrder]]: unset,
        // [[TopLevelCapability]]: empty,
        // [[AsyncParentModules]]: « »,
        // [[PendingAsyncDependencies]]: empty,
        // [[Status]]: new,
        // [[EvaluationError]]: empty,
        // [[RequestedModules]]: requestedModules,
        // [[LoadedModules]]: « »,
        // [[DFSIndex]]: empty,
        // [[DFSAncestorIndex]]: empty
        cyclic_fields: CyclicModuleRecord::new(
            scanner.has_tla,
            requested_modules.into_boxed_slice(),
        ),
        // [[ECMAScriptCode]]: body,
        ecmascript_code: Some(ecmascript_code),
        // [[ImportEntries]]: importEntries,
        import_entries: import_entries.into_boxed_slice(),
        // [[LocalExportEntries]]: localExportEntries,
        local_export_entries: local_export_entries.into_boxed_slice(),
        // [[IndirectExportEntries]]: indirectExportEntries,
        indirect_export_entries: indirect_export_entries.into_boxed_slice(),
        // [[StarExportEntries]]: starExportEntries,
        star_export_entries: star_export_entries.into_boxed_slice(),
        var_names: declarations.var_names.into_boxed_slice(),
        lexical_declarations: declarations.lexical_declarations.into_boxed_slice(),
    });
    // }.
    if agent.options.print_internals {
        eprintln!(
            "Parsed {module:?}: {} requested modules, top-level await: {}",
            module.requested_modules(agent).len(),
            module.has_tla(agent)
        );
    }
    Ok(module)
}

fn module_request_record(
    source: &ast::StringLiteral,
    with_clause: Option<&ast::WithClause>,
    phase: Option<ast::ImportPhase>,
) -> ModuleRequestRecord {
    let attributes = with_clause
        .into_iter()
        .flat_map(|with_clause| with_clause.with_entries.iter())
        .map(|attribute| {
            ImportAttributeRecord::new(
                attribute.key.as_atom().as_str(),
                attribute.value.value.as_str(),
            )
        });
    let phase = match phase {
        None => ImportPhase::Evaluation,
        Some(ast::ImportPhase::Source) => ImportPhase::Source,
        Some(ast::ImportPhase::Defer) => ImportPhase::Defer,
    };
    ModuleRequestRecord::new(source.value.as_str(), attributes, phase)
}

/// ModuleRequests never contain two requests for which ModuleRequestsEqual
/// is true.
fn push_module_request(
    requested_modules: &mut Vec<ModuleRequestRecord>,
    request: &ModuleRequestRecord,
) {
    if !requested_modules
        .iter()
        .any(|requested| module_requests_equal(requested, request))
    {
        requested_modules.push(request.clone());
    }
}

/// Finds `await` outside of functions and the `var` declarations hoisted to
/// the module scope.
#[derive(Default)]
struct ModuleBodyScanner {
    has_tla: bool,
    var_names: Vec<Rc<str>>,
}

impl<'a> Visit<'a> for ModuleBodyScanner {
    fn visit_await_expression(&mut self, it: &ast::AwaitExpression<'a>) {
        self.has_tla = true;
        walk::walk_await_expression(self, it);
    }

    fn visit_for_of_statement(&mut self, it: &ast::ForOfStatement<'a>) {
        if it.r#await {
            self.has_tla = true;
        }
        walk::walk_for_of_statement(self, it);
    }

    fn visit_variable_declaration(&mut self, it: &ast::VariableDeclaration<'a>) {
        if it.kind.is_await() {
            self.has_tla = true;
        }
        if it.kind.is_var() && !it.declare {
            it.bound_names(&mut |name| {
                let name: Rc<str> = name.name.as_str().into();
                if !self.var_names.contains(&name) {
                    self.var_names.push(name);
                }
            });
        }
        walk::walk_variable_declaration(self, it);
    }

    fn visit_function(&mut self, _it: &ast::Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ast::ArrowFunctionExpression<'a>) {}

    fn visit_static_block(&mut self, _it: &ast::StaticBlock<'a>) {}
}

struct TopLevelDeclarations {
    var_names: Vec<Rc<str>>,
    lexical_declarations: Vec<(Rc<str>, bool)>,
}

/// Collects the VarDeclaredNames and LexicallyScopedDeclarations of the
/// module body. Function declarations are bound like `var` declarations and
/// initialized by the module body.
fn top_level_declarations(program: &Program, var_names: Vec<Rc<str>>) -> TopLevelDeclarations {
    let mut declarations = TopLevelDeclarations {
        var_names,
        lexical_declarations: vec![],
    };
    for statement in program.body.iter() {
        match statement {
            ast::Statement::VariableDeclaration(decl) => declarations.variable(decl),
            ast::Statement::FunctionDeclaration(f) => declarations.function(f),
            ast::Statement::ClassDeclaration(c) => declarations.class(c),
            ast::Statement::ExportNamedDeclaration(ee) => match &ee.declaration {
                Some(ast::Declaration::VariableDeclaration(decl)) => declarations.variable(decl),
                Some(ast::Declaration::FunctionDeclaration(f)) => declarations.function(f),
                Some(ast::Declaration::ClassDeclaration(c)) => declarations.class(c),
                _ => {}
            },
            ast::Statement::ExportDefaultDeclaration(ee) => match &ee.declaration {
                ast::ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                    if f.id.is_some() {
                        declarations.function(f);
                    } else {
                        declarations.push_var(DEFAULT_BINDING_NAME.into());
                    }
                }
                ast::ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                    if c.id.is_some() {
                        declarations.class(c);
                    } else {
                        declarations
                            .lexical_declarations
                            .push((DEFAULT_BINDING_NAME.into(), false));
                    }
                }
                ast::ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {}
                _ => {
                    // No syntax permits assignment to "*default*".
                    declarations
                        .lexical_declarations
                        .push((DEFAULT_BINDING_NAME.into(), true));
                }
            },
            _ => {}
        }
    }
    declarations
}

impl TopLevelDeclarations {
    fn push_var(&mut self, name: Rc<str>) {
        if !self.var_names.contains(&name) {
            self.var_names.push(name);
        }
    }

    fn variable(&mut self, decl: &ast::VariableDeclaration) {
        // Var declarations were collected by the scanner.
        if !decl.kind.is_lexical() || decl.declare {
            return;
        }
        let is_constant = decl.kind.is_const() || decl.kind.is_using();
        decl.bound_names(&mut |name| {
            self.lexical_declarations
                .push((name.name.as_str().into(), is_constant));
        });
    }

    fn function(&mut self, f: &ast::Function) {
        if f.declare || f.body.is_none() {
            return;
        }
        if let Some(id) = &f.id {
            self.push_var(id.name.as_str().into());
        }
    }

    fn class(&mut self, c: &ast::Class) {
        if c.declare {
            return;
        }
        if let Some(id) = &c.id {
            self.lexical_declarations
                .push((id.name.as_str().into(), false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ecmascript::execution::{DefaultHostHooks, Options},
        engine::EmptyModuleBody,
    };

    fn agent() -> Agent {
        let host_hooks: &DefaultHostHooks = Box::leak(Box::default());
        Agent::new(Options::default(), host_hooks)
    }

    fn parse(agent: &mut Agent, source_text: &str) -> SourceTextModule {
        parse_module(agent, source_text, None, |_| Box::new(EmptyModuleBody))
            .expect("module should parse")
    }

    #[test]
    fn requested_modules_are_deduplicated_in_source_order() {
        let mut agent = agent();
        let module = parse(
            &mut agent,
            r#"
            import { a } from "./a.js";
            export { b } from "./b.js";
            import c from "./a.js";
            import data from "./a.js" with { type: "json" };
            export * from "./c.js";
            "#,
        );
        let specifiers = module
            .requested_modules(&agent)
            .iter()
            .map(|request| {
                (
                    request.specifier().to_string(),
                    request.attribute("type").map(String::from),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            specifiers,
            vec![
                ("./a.js".to_string(), None),
                ("./b.js".to_string(), None),
                ("./a.js".to_string(), Some("json".to_string())),
                ("./c.js".to_string(), None),
            ]
        );
        assert_eq!(module.status(&agent), CyclicModuleRecordStatus::New);
    }

    #[test]
    fn export_entries_are_classified() {
        let mut agent = agent();
        let module = parse(
            &mut agent,
            r#"
            import { x } from "./x.js";
            import * as ns from "./ns.js";
            export { x as y, ns };
            export let local = 1;
            export * as all from "./all.js";
            export * from "./star.js";
            export default 42;
            "#,
        );
        let local = module
            .local_export_entries(&agent)
            .iter()
            .map(|e| (&*e.export_name, &*e.local_name))
            .collect::<Vec<_>>();
        assert_eq!(
            local,
            vec![("ns", "ns"), ("local", "local"), ("default", "*default*")]
        );
        let indirect = module.indirect_export_entries(&agent);
        assert_eq!(indirect.len(), 2);
        assert_eq!(&*indirect[0].export_name, "y");
        assert_eq!(indirect[0].import_name.as_deref(), Some("x"));
        assert_eq!(indirect[0].module_request.specifier(), "./x.js");
        assert_eq!(&*indirect[1].export_name, "all");
        assert_eq!(indirect[1].import_name, None);
        let star = module.star_export_entries(&agent);
        assert_eq!(star.len(), 1);
        assert_eq!(star[0].specifier(), "./star.js");
    }

    #[test]
    fn top_level_await_is_detected_outside_functions_only() {
        let mut agent = agent();
        let sync = parse(
            &mut agent,
            "async function f() { await 1; } const g = async () => { await 2; };",
        );
        assert!(!sync.has_tla(&agent));
        let r#async = parse(&mut agent, "if (true) { await Promise.resolve(1); }");
        assert!(r#async.has_tla(&agent));
        let for_await = parse(&mut agent, "for await (const x of []) {}");
        assert!(for_await.has_tla(&agent));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut agent = agent();
        let result = parse_module(&mut agent, "import { from './a.js';", None, |_| {
            Box::new(EmptyModuleBody)
        });
        assert!(result.is_err());
        let result = parse_module(&mut agent, "let a; let a;", None, |_| {
            Box::new(EmptyModuleBody)
        });
        assert!(result.is_err());
    }
}

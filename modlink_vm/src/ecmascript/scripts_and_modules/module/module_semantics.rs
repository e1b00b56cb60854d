// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1 Module Semantics](https://tc39.es/ecma262/#sec-module-semantics)

pub mod abstract_module_records;
pub mod cyclic_module_records;
pub mod source_text_module_records;
pub mod synthetic_module_records;

use std::rc::Rc;

use crate::ecmascript::{
    builtins::{Module, module::module_namespace_create},
    execution::{Agent, JsResult},
};

pub use abstract_module_records::{ResolveExportResult, ResolvedBinding, ResolvedBindingName};

use abstract_module_records::AbstractModule;
use cyclic_module_records::{GraphLoadingState, continue_module_loading};
use source_text_module_records::SourceTextModule;

/// The phase of an import declaration.
///
/// Phased imports are parsed and recorded, but loading, linking and
/// evaluation treat every phase the same way.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportPhase {
    /// ```javascript
    /// import x from "mod";
    /// ```
    #[default]
    Evaluation,
    /// ```javascript
    /// import source x from "mod";
    /// ```
    Source,
    /// ```javascript
    /// import defer * as x from "mod";
    /// ```
    Defer,
}

/// ### [ImportAttribute Record](https://tc39.es/ecma262/#table-importattribute-fields)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportAttributeRecord {
    /// ### \[\[Key]]
    ///
    /// The attribute key
    pub key: Rc<str>,
    /// ### \[\[Value]]
    ///
    /// The attribute value
    pub value: Rc<str>,
}

impl ImportAttributeRecord {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// ### [ModuleRequest Record](https://tc39.es/ecma262/#modulerequest-record)
///
/// A ModuleRequest Record represents the request to import a module with
/// given import attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequestRecord {
    /// ### \[\[Specifier]]
    ///
    /// a String
    ///
    /// The module specifier
    specifier: Rc<str>,
    /// ### \[\[Attributes]]
    ///
    /// a List of ImportAttribute Records
    ///
    /// The import attributes
    attributes: Box<[ImportAttributeRecord]>,
    /// ### \[\[Phase]]
    ///
    /// source, defer or evaluation
    phase: ImportPhase,
}

impl ModuleRequestRecord {
    pub fn new(
        specifier: &str,
        attributes: impl IntoIterator<Item = ImportAttributeRecord>,
        phase: ImportPhase,
    ) -> Self {
        Self {
            specifier: specifier.into(),
            attributes: attributes.into_iter().collect(),
            phase,
        }
    }

    /// A request with no attributes in the evaluation phase.
    pub fn from_specifier(specifier: &str) -> Self {
        Self::new(specifier, [], ImportPhase::Evaluation)
    }

    /// ### \[\[Specifier]]
    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// ### \[\[Attributes]]
    pub fn attributes(&self) -> &[ImportAttributeRecord] {
        &self.attributes
    }

    /// Returns the value of the attribute with the given key, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| &*attribute.key == key)
            .map(|attribute| &*attribute.value)
    }

    /// ### \[\[Phase]]
    pub fn phase(&self) -> ImportPhase {
        self.phase
    }
}

/// ### [LoadedModuleRequest Record](https://tc39.es/ecma262/#table-loadedmodulerequest-fields)
#[derive(Debug, Clone)]
pub(crate) struct LoadedModuleRequestRecord {
    /// \[\[Specifier]] and \[\[Attributes]] of the request.
    pub(crate) request: ModuleRequestRecord,
    /// ### \[\[Module]]
    ///
    /// The loaded module corresponding to this module request
    pub(crate) module: AbstractModule,
}

/// ### [16.2.1.3.1 ModuleRequestsEqual ( left, right )](https://tc39.es/ecma262/#sec-ModuleRequestsEqual)
///
/// The abstract operation ModuleRequestsEqual takes arguments left (a
/// ModuleRequest Record or a LoadedModuleRequest Record) and right (a
/// ModuleRequest Record or a LoadedModuleRequest Record) and returns a
/// Boolean.
pub fn module_requests_equal(left: &ModuleRequestRecord, right: &ModuleRequestRecord) -> bool {
    // 1. If left.[[Specifier]] is not right.[[Specifier]], return false.
    if left.specifier != right.specifier {
        return false;
    }
    // 2. Let leftAttrs be left.[[Attributes]].
    let left_attrs = &left.attributes;
    // 3. Let rightAttrs be right.[[Attributes]].
    let right_attrs = &right.attributes;
    // 4. Let leftAttrsCount be the number of elements in leftAttrs.
    // 5. Let rightAttrsCount be the number of elements in rightAttrs.
    // 6. If leftAttrsCount ≠ rightAttrsCount, return false.
    if left_attrs.len() != right_attrs.len() {
        return false;
    }
    // 7. For each ImportAttribute Record l of leftAttrs, do
    //     a. If rightAttrs does not contain an ImportAttribute Record r such
    //        that l.[[Key]] is r.[[Key]] and l.[[Value]] is r.[[Value]],
    //        return false.
    // 8. Return true.
    left_attrs.iter().all(|l| right_attrs.contains(l))
}

/// ### [16.2.1.5 GetImportedModule ( referrer, request )](https://tc39.es/ecma262/#sec-GetImportedModule)
///
/// The abstract operation GetImportedModule takes arguments referrer (a
/// Cyclic Module Record) and request (a ModuleRequest Record) and returns a
/// Module Record.
pub(crate) fn get_imported_module(
    agent: &Agent,
    referrer: SourceTextModule,
    request: &ModuleRequestRecord,
) -> AbstractModule {
    // 1. Let records be a List consisting of each LoadedModuleRequest Record
    //    r of referrer.[[LoadedModules]] such that ModuleRequestsEqual(r,
    //    request) is true.
    // 2. Assert: records has exactly one element, since LoadRequestedModules
    //    has completed successfully on referrer prior to invoking this
    //    abstract operation.
    // 3. Let record be the sole element of records.
    // 4. Return record.[[Module]].
    referrer
        .get_loaded_module(agent, request)
        .expect("Module request was not loaded")
}

/// ### [16.2.1.10 FinishLoadingImportedModule ( referrer, moduleRequest, payload, result )](https://tc39.es/ecma262/#sec-FinishLoadingImportedModule)
///
/// The abstract operation FinishLoadingImportedModule takes arguments
/// referrer (a Script Record, a Cyclic Module Record, or a Realm Record),
/// moduleRequest (a ModuleRequest Record), payload (a GraphLoadingState
/// Record or a PromiseCapability Record), and result (either a normal
/// completion containing a Module Record or a throw completion) and returns
/// unused.
///
/// Hosts call this exactly once for every call of
/// [`HostHooks::load_imported_module`](crate::ecmascript::execution::agent::HostHooks::load_imported_module),
/// either synchronously or from a later job. Answers that arrive after the
/// load has already failed are ignored.
pub fn finish_loading_imported_module(
    agent: &mut Agent,
    referrer: SourceTextModule,
    module_request: &ModuleRequestRecord,
    payload: GraphLoadingState,
    result: JsResult<AbstractModule>,
) {
    // 1. If result is a normal completion, then
    if let Ok(module) = result {
        // NOTE: A failed load leaves its graph untouched from here on.
        if agent[payload].is_loading {
            // a. If referrer.[[LoadedModules]] contains a LoadedModuleRequest
            //    Record record such that ModuleRequestsEqual(record,
            //    moduleRequest) is true, then
            //     i. Assert: record.[[Module]] and result.[[Value]] are the
            //        same Module Record.
            // b. Else,
            //     i. Append the LoadedModuleRequest Record {
            //        [[Specifier]]: moduleRequest.[[Specifier]],
            //        [[Attributes]]: moduleRequest.[[Attributes]],
            //        [[Module]]: result.[[Value]] } to
            //        referrer.[[LoadedModules]].
            referrer.insert_loaded_module(agent, module_request, module);
        }
    }
    // 2. If payload is a GraphLoadingState Record, then
    //     a. Perform ContinueModuleLoading(payload, result).
    continue_module_loading(agent, payload, result);
    // 4. Return unused.
}

/// ### [16.2.1.11 AllImportAttributesSupported ( attributes )](https://tc39.es/ecma262/#sec-AllImportAttributesSupported)
///
/// The abstract operation AllImportAttributesSupported takes argument
/// attributes (a List of ImportAttribute Records) and returns a Boolean.
pub(crate) fn all_import_attributes_supported(
    agent: &Agent,
    attributes: &[ImportAttributeRecord],
) -> bool {
    // 1. Let supported be HostGetSupportedImportAttributes().
    let supported = agent.host_hooks.get_supported_import_attributes();
    // 2. For each ImportAttribute Record attribute of attributes, do
    //     a. If supported does not contain attribute.[[Key]], return false.
    // 3. Return true.
    attributes
        .iter()
        .all(|attribute| supported.iter().any(|key| *key == &*attribute.key))
}

/// ### [16.2.1.12 GetModuleNamespace ( module )](https://tc39.es/ecma262/#sec-getmodulenamespace)
///
/// The abstract operation GetModuleNamespace takes argument module (an
/// instance of a concrete subclass of Module Record) and returns a Module
/// Namespace Object. It retrieves the Module Namespace Object representing
/// module's exports, lazily creating it the first time it was requested, and
/// storing it in module.\[\[Namespace]] for future retrieval.
///
/// > NOTE: GetModuleNamespace never throws. Instead, unresolvable names are
/// > simply excluded from the namespace at this point. They will lead to a
/// > real linking error later unless they are all ambiguous star exports that
/// > are not explicitly requested anywhere.
pub fn get_module_namespace(agent: &mut Agent, module: AbstractModule) -> Module {
    // 1. Assert: If module is a Cyclic Module Record, then module.[[Status]]
    //    is not new or unlinked.
    debug_assert!(!matches!(
        module.status(agent),
        Some(
            cyclic_module_records::CyclicModuleRecordStatus::New
                | cyclic_module_records::CyclicModuleRecordStatus::Unlinked
        )
    ));
    // 2. Let namespace be module.[[Namespace]].
    // 3. If namespace is EMPTY, then
    if let Some(namespace) = module.namespace(agent) {
        // 4. Return namespace.
        return namespace;
    }
    // a. Let exportedNames be module.GetExportedNames().
    let exported_names = module.get_exported_names(agent);
    // b. Let unambiguousNames be a new empty List.
    // c. For each element name of exportedNames, do
    //     i. Let resolution be module.ResolveExport(name).
    //     ii. If resolution is a ResolvedBinding Record, append name to
    //         unambiguousNames.
    let unambiguous_names = exported_names
        .into_iter()
        .filter(|name| {
            matches!(
                module.resolve_export(agent, name),
                ResolveExportResult::Resolved(_)
            )
        })
        .collect();
    // d. Set namespace to ModuleNamespaceCreate(module, unambiguousNames).
    module_namespace_create(agent, module, unambiguous_names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_requests_equal_ignores_attribute_order() {
        let left = ModuleRequestRecord::new(
            "./data.json",
            [
                ImportAttributeRecord::new("type", "json"),
                ImportAttributeRecord::new("mode", "strict"),
            ],
            ImportPhase::Evaluation,
        );
        let right = ModuleRequestRecord::new(
            "./data.json",
            [
                ImportAttributeRecord::new("mode", "strict"),
                ImportAttributeRecord::new("type", "json"),
            ],
            ImportPhase::Defer,
        );
        assert!(module_requests_equal(&left, &right));
    }

    #[test]
    fn module_requests_differ_by_specifier_or_attributes() {
        let plain = ModuleRequestRecord::from_specifier("./a.js");
        let other = ModuleRequestRecord::from_specifier("./b.js");
        let json = ModuleRequestRecord::new(
            "./a.js",
            [ImportAttributeRecord::new("type", "json")],
            ImportPhase::Evaluation,
        );
        assert!(!module_requests_equal(&plain, &other));
        assert!(!module_requests_equal(&plain, &json));
        assert_eq!(json.attribute("type"), Some("json"));
        assert_eq!(plain.attribute("type"), None);
    }
}

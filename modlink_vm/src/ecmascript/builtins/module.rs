// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.4.6 Module Namespace Exotic Objects](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)

pub(crate) mod data;

use std::{
    ops::{Index, IndexMut},
    rc::Rc,
};

use crate::{
    ecmascript::{
        execution::{Agent, JsResult, agent::ExceptionType},
        scripts_and_modules::module::module_semantics::{
            ResolveExportResult, ResolvedBindingName, abstract_module_records::AbstractModule,
            get_module_namespace,
        },
        types::Value,
    },
    heap::{CreateHeapData, Heap, indexes::ModuleIndex},
};

use data::ModuleHeapData;

/// A module namespace exotic object exposes the bindings exported from an
/// ECMAScript Module. There is a one-to-one correspondence between the String
/// keys of the namespace's own properties and the binding names exported by
/// the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Module(pub(crate) ModuleIndex);

impl Module {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// \[\[Module]]
    pub fn module(self, agent: &Agent) -> AbstractModule {
        agent[self].module
    }

    /// \[\[Exports]], sorted by UTF-16 code unit order.
    pub fn exports(self, agent: &Agent) -> &[Rc<str>] {
        &agent[self].exports
    }

    /// ### [10.4.6.7 \[\[HasProperty\]\] ( P )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-hasproperty-p)
    pub fn has_property(self, agent: &Agent, property_key: &str) -> bool {
        // 2. Let exports be O.[[Exports]].
        // 3. If exports contains P, return true.
        // 4. Return false.
        agent[self]
            .exports
            .iter()
            .any(|export| &**export == property_key)
    }

    /// ### [10.4.6.8 \[\[Get\]\] ( P, Receiver )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-get-p-receiver)
    pub fn get(self, agent: &mut Agent, property_key: &str) -> JsResult<Value> {
        // 2. Let exports be O.[[Exports]].
        // 3. If exports does not contain P, return undefined.
        if !self.has_property(agent, property_key) {
            return Ok(Value::Undefined);
        }
        // 4. Let m be O.[[Module]].
        let m = agent[self].module;
        // 5. Let binding be m.ResolveExport(P).
        let binding = m.resolve_export(agent, property_key);
        // 6. Assert: binding is a ResolvedBinding Record.
        let ResolveExportResult::Resolved(binding) = binding else {
            let error_message = format!("Could not resolve export '{property_key}'.");
            return Err(agent.throw_exception(ExceptionType::SyntaxError, error_message));
        };
        // 7. Let targetModule be binding.[[Module]].
        // 8. Assert: targetModule is not undefined.
        let target_module = binding.module;
        let binding_name = match binding.binding_name {
            // 9. If binding.[[BindingName]] is NAMESPACE, then
            ResolvedBindingName::Namespace => {
                // a. Return GetModuleNamespace(targetModule).
                return Ok(get_module_namespace(agent, target_module).into());
            }
            ResolvedBindingName::String(name) => name,
        };
        // 10. Let targetEnv be targetModule.[[Environment]].
        // 11. If targetEnv is EMPTY, throw a ReferenceError exception.
        let Some(target_env) = target_module.environment(agent) else {
            let error_message = format!("Module providing '{property_key}' has not been linked.");
            return Err(agent.throw_exception(ExceptionType::ReferenceError, error_message));
        };
        // 12. Return ? targetEnv.GetBindingValue(binding.[[BindingName]], true).
        target_env.get_binding_value(agent, &binding_name)
    }

    /// ### [10.4.6.11 \[\[OwnPropertyKeys\]\] ( )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-ownpropertykeys)
    ///
    /// Returns every export name paired with its current value.
    pub fn entries(self, agent: &mut Agent) -> JsResult<Vec<(Rc<str>, Value)>> {
        let exports = agent[self].exports.clone();
        exports
            .iter()
            .map(|name| Ok((name.clone(), self.get(agent, name)?)))
            .collect()
    }
}

/// ### [10.4.6.12 ModuleNamespaceCreate ( module, exports )](https://tc39.es/ecma262/#sec-modulenamespacecreate)
///
/// The abstract operation ModuleNamespaceCreate takes arguments module (a
/// Module Record) and exports (a List of Strings) and returns a module
/// namespace exotic object. It is used to specify the creation of new module
/// namespace exotic objects.
pub(crate) fn module_namespace_create(
    agent: &mut Agent,
    module: AbstractModule,
    mut exports: Vec<Rc<str>>,
) -> Module {
    // 1. Assert: module.[[Namespace]] is EMPTY.
    debug_assert!(module.namespace(agent).is_none());
    // 7. Let sortedExports be a List whose elements are the elements of
    //    exports, sorted according to lexicographic code unit order.
    exports.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    // 2. Let internalSlotsList be the internal slots listed in Table 33.
    // 3. Let M be MakeBasicObject(internalSlotsList).
    // 5. Set M.[[Module]] to module.
    // 8. Set M.[[Exports]] to sortedExports.
    let namespace = agent.heap.create(ModuleHeapData {
        module,
        exports: exports.into_boxed_slice(),
    });
    // 10. Set module.[[Namespace]] to M.
    module.set_namespace(agent, namespace);
    // 11. Return M.
    namespace
}

impl Index<Module> for Agent {
    type Output = ModuleHeapData;

    fn index(&self, index: Module) -> &Self::Output {
        &self.heap.modules[index]
    }
}

impl IndexMut<Module> for Agent {
    fn index_mut(&mut self, index: Module) -> &mut Self::Output {
        &mut self.heap.modules[index]
    }
}

impl Index<Module> for Vec<ModuleHeapData> {
    type Output = ModuleHeapData;

    fn index(&self, index: Module) -> &Self::Output {
        self.get(index.get_index())
            .expect("Module out of bounds")
    }
}

impl IndexMut<Module> for Vec<ModuleHeapData> {
    fn index_mut(&mut self, index: Module) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("Module out of bounds")
    }
}

impl CreateHeapData<ModuleHeapData, Module> for Heap {
    fn create(&mut self, data: ModuleHeapData) -> Module {
        self.modules.push(data);
        Module(ModuleIndex::last(&self.modules))
    }
}

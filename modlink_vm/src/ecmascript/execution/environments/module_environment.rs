// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    ops::{Index, IndexMut},
    rc::Rc,
};

use ahash::AHashMap;

use crate::{
    ecmascript::{
        execution::{Agent, JsResult, agent::ExceptionType},
        scripts_and_modules::module::module_semantics::abstract_module_records::AbstractModule,
        types::Value,
    },
    heap::{CreateHeapData, Heap, indexes::ModuleEnvironmentIndex},
};

/// ### [9.1.1.5 Module Environment Records](https://tc39.es/ecma262/#sec-module-environment-records)
/// A Module Environment Record is a Declarative Environment Record that is
/// used to represent the outer scope of an ECMAScript Module. In additional to
/// normal mutable and immutable bindings, Module Environment Records also
/// provide immutable import bindings which are bindings that provide indirect
/// access to a target binding that exists in another Environment Record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ModuleEnvironment(ModuleEnvironmentIndex);

#[derive(Debug, Clone, Default)]
pub struct ModuleEnvironmentRecord {
    /// The environment's bindings.
    bindings: AHashMap<Rc<str>, ModuleBinding>,
}

#[derive(Debug, Clone)]
enum ModuleBinding {
    /// A binding owned by this environment. Module code is always strict
    /// code, so every binding is a strict binding.
    Lexical { value: Option<Value>, mutable: bool },
    /// An import binding created by CreateImportBinding: reads go to the
    /// binding `name` in `module`'s environment.
    Indirect { module: AbstractModule, name: Rc<str> },
}

impl ModuleEnvironmentRecord {
    fn create_binding(&mut self, name: &str, binding: ModuleBinding) {
        // 1. Assert: envRec does not already have a binding for N.
        debug_assert!(!self.bindings.contains_key(name));
        self.bindings.insert(name.into(), binding);
    }
}

impl ModuleEnvironment {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// ##### [9.1.1.1.1 HasBinding ( N )](https://tc39.es/ecma262/#sec-declarative-environment-records-hasbinding-n)
    pub fn has_binding(self, agent: &Agent, name: &str) -> bool {
        // 1. If envRec has a binding for N, return true.
        // 2. Return false.
        agent[self].bindings.contains_key(name)
    }

    /// Returns true if the binding exists and has been initialized. Import
    /// bindings count as initialized.
    pub fn is_binding_initialized(self, agent: &Agent, name: &str) -> bool {
        match agent[self].bindings.get(name) {
            Some(ModuleBinding::Lexical { value, .. }) => value.is_some(),
            Some(ModuleBinding::Indirect { .. }) => true,
            None => false,
        }
    }

    /// ##### [9.1.1.1.2 CreateMutableBinding ( N, D )](https://tc39.es/ecma262/#sec-declarative-environment-records-createmutablebinding-n-d)
    ///
    /// Creates a new mutable binding for the name N that is uninitialized. A
    /// binding must not already exist in this Environment Record for N.
    pub fn create_mutable_binding(self, agent: &mut Agent, name: &str) {
        // 2. Create a mutable binding in envRec for N and record that it is
        //    uninitialized.
        agent[self].create_binding(
            name,
            ModuleBinding::Lexical {
                value: None,
                mutable: true,
            },
        );
        // 3. Return UNUSED.
    }

    /// ##### [9.1.1.1.3 CreateImmutableBinding ( N, S )](https://tc39.es/ecma262/#sec-declarative-environment-records-createimmutablebinding-n-s)
    ///
    /// Creates a new immutable binding for the name N that is uninitialized. A
    /// binding must not already exist in this Environment Record for N.
    pub fn create_immutable_binding(self, agent: &mut Agent, name: &str) {
        // 2. Create an immutable binding in envRec for N and record that it is
        //    uninitialized.
        agent[self].create_binding(
            name,
            ModuleBinding::Lexical {
                value: None,
                mutable: false,
            },
        );
        // 3. Return UNUSED.
    }

    /// ##### [9.1.1.5.5 CreateImportBinding ( N, M, N2 )](https://tc39.es/ecma262/#sec-createimportbinding)
    ///
    /// Creates a new initialized immutable indirect binding for the name N. A
    /// binding must not already exist in this Environment Record for N. N2 is
    /// the name of a binding that exists in M's Module Environment Record.
    /// Accesses to the value of the new binding will indirectly access the
    /// bound value of the target binding.
    pub fn create_import_binding(
        self,
        agent: &mut Agent,
        name: &str,
        module: AbstractModule,
        binding_name: Rc<str>,
    ) {
        // 1. Assert: envRec does not already have a binding for N.
        // 2. Assert: When M.[[Environment]] is instantiated, it will have a
        //    direct binding for N2.
        // 3. Create an immutable indirect binding in envRec for N that
        //    references M and N2 as its target binding and record that the
        //    binding is initialized.
        agent[self].create_binding(
            name,
            ModuleBinding::Indirect {
                module,
                name: binding_name,
            },
        );
        // 4. Return UNUSED.
    }

    /// ##### [9.1.1.1.4 InitializeBinding ( N, V )](https://tc39.es/ecma262/#sec-declarative-environment-records-initializebinding-n-v)
    ///
    /// Sets the bound value of the current binding of the identifier whose
    /// name is N to the value V. An uninitialized binding for N must already
    /// exist.
    pub fn initialize_binding(self, agent: &mut Agent, name: &str, value: Value) {
        // 1. Assert: envRec must have an uninitialized binding for N.
        // 2. Set the bound value for N in envRec to V.
        // 3. Record that the binding for N in envRec has been initialized.
        match agent[self].bindings.get_mut(name) {
            Some(ModuleBinding::Lexical { value: slot, .. }) => {
                debug_assert!(slot.is_none());
                *slot = Some(value);
            }
            _ => debug_assert!(false, "InitializeBinding on a missing binding '{name}'"),
        }
        // 4. Return UNUSED.
    }

    /// ##### [9.1.1.1.5 SetMutableBinding ( N, V, S )](https://tc39.es/ecma262/#sec-declarative-environment-records-setmutablebinding-n-v-s)
    ///
    /// Attempts to change the bound value of the current binding of the
    /// identifier whose name is N to the value V. Module code is strict, so
    /// assigning to a missing, uninitialized or immutable binding throws.
    pub fn set_mutable_binding(self, agent: &mut Agent, name: &str, value: Value) -> JsResult<()> {
        let env_rec = &mut agent[self];
        // 1. If envRec does not have a binding for N, then
        let Some(binding) = env_rec.bindings.get_mut(name) else {
            // a. If S is true, throw a ReferenceError exception.
            let error_message = format!("Cannot assign to nonexisting binding '{name}'.");
            return Err(agent.throw_exception(ExceptionType::ReferenceError, error_message));
        };

        match binding {
            // 3. If the binding for N in envRec has not yet been initialized, then
            ModuleBinding::Lexical { value: None, .. } => {
                // a. Throw a ReferenceError exception.
                let error_message = format!("Identifier '{name}' has not been initialized.");
                Err(agent.throw_exception(ExceptionType::ReferenceError, error_message))
            }
            // 4. Else if the binding for N in envRec is a mutable binding, then
            ModuleBinding::Lexical {
                value: Some(slot),
                mutable: true,
            } => {
                // a. Change its bound value to V.
                *slot = value;
                // 6. Return UNUSED.
                Ok(())
            }
            // 5. Else,
            // a. Assert: This is an attempt to change the value of an immutable binding.
            // b. If S is true, throw a TypeError exception.
            ModuleBinding::Lexical { .. } | ModuleBinding::Indirect { .. } => {
                let error_message =
                    format!("Cannot assign to immutable identifier '{name}' in strict mode.");
                Err(agent.throw_exception(ExceptionType::TypeError, error_message))
            }
        }
    }

    /// ##### [9.1.1.5.1 GetBindingValue ( N, S )](https://tc39.es/ecma262/#sec-module-environment-records-getbindingvalue-n-s)
    ///
    /// Returns the value of its bound identifier whose name is N. However, if
    /// the binding is an indirect binding the value of the target binding is
    /// returned. If the binding exists but is uninitialized a ReferenceError
    /// is thrown.
    pub fn get_binding_value(self, agent: &mut Agent, name: &str) -> JsResult<Value> {
        let mut env = self;
        let mut name: Rc<str> = name.into();
        loop {
            // 1. Assert: S is true.
            // 2. Assert: envRec has a binding for N.
            match agent[env].bindings.get(&name) {
                // 3. If the binding for N is an indirect binding, then
                Some(ModuleBinding::Indirect {
                    module,
                    name: binding_name,
                }) => {
                    // a. Let M and N2 be the indirection values provided when
                    //    this binding for N was created.
                    let (module, binding_name) = (*module, binding_name.clone());
                    // b. Let targetEnv be M.[[Environment]].
                    // c. If targetEnv is EMPTY, throw a ReferenceError exception.
                    let Some(target_env) = module.environment(agent) else {
                        let error_message =
                            format!("Module providing binding '{name}' has not been linked.");
                        return Err(
                            agent.throw_exception(ExceptionType::ReferenceError, error_message)
                        );
                    };
                    // d. Return ? targetEnv.GetBindingValue(N2, true).
                    env = target_env;
                    name = binding_name;
                }
                // 4. If the binding for N in envRec is an uninitialized binding,
                //    throw a ReferenceError exception.
                Some(ModuleBinding::Lexical { value: None, .. }) => {
                    let error_message = format!("Cannot access '{name}' before initialization.");
                    return Err(agent.throw_exception(ExceptionType::ReferenceError, error_message));
                }
                // 5. Return the value currently bound to N in envRec.
                Some(ModuleBinding::Lexical {
                    value: Some(value), ..
                }) => return Ok(value.clone()),
                None => {
                    let error_message = format!("'{name}' is not defined.");
                    return Err(agent.throw_exception(ExceptionType::ReferenceError, error_message));
                }
            }
        }
    }

    /// Names of every binding in this environment, in no particular order.
    pub fn binding_names(self, agent: &Agent) -> Vec<Rc<str>> {
        agent[self].bindings.keys().cloned().collect()
    }
}

/// ### [9.1.2.6 NewModuleEnvironment ( E )](https://tc39.es/ecma262/#sec-newmoduleenvironment)
///
/// The abstract operation NewModuleEnvironment takes argument E (an
/// Environment Record) and returns a Module Environment Record. The outer
/// environment of every module is the global environment, which holds no
/// bindings here.
pub(crate) fn new_module_environment(agent: &mut Agent) -> ModuleEnvironment {
    // 1. Let env be a new Module Environment Record containing no bindings.
    // 2. Set env.[[OuterEnv]] to E.
    // 3. Return env.
    agent.heap.create(ModuleEnvironmentRecord::default())
}

impl Index<ModuleEnvironment> for Agent {
    type Output = ModuleEnvironmentRecord;

    fn index(&self, index: ModuleEnvironment) -> &Self::Output {
        &self.heap.module_environments[index]
    }
}

impl IndexMut<ModuleEnvironment> for Agent {
    fn index_mut(&mut self, index: ModuleEnvironment) -> &mut Self::Output {
        &mut self.heap.module_environments[index]
    }
}

impl Index<ModuleEnvironment> for Vec<ModuleEnvironmentRecord> {
    type Output = ModuleEnvironmentRecord;

    fn index(&self, index: ModuleEnvironment) -> &Self::Output {
        self.get(index.get_index())
            .expect("ModuleEnvironment out of bounds")
    }
}

impl IndexMut<ModuleEnvironment> for Vec<ModuleEnvironmentRecord> {
    fn index_mut(&mut self, index: ModuleEnvironment) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("ModuleEnvironment out of bounds")
    }
}

impl CreateHeapData<ModuleEnvironmentRecord, ModuleEnvironment> for Heap {
    fn create(&mut self, data: ModuleEnvironmentRecord) -> ModuleEnvironment {
        self.module_environments.push(data);
        ModuleEnvironment(ModuleEnvironmentIndex::last(&self.module_environments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecmascript::execution::{DefaultHostHooks, Options};

    fn agent() -> Agent {
        let host_hooks: &DefaultHostHooks = Box::leak(Box::default());
        Agent::new(Options::default(), host_hooks)
    }

    #[test]
    fn uninitialized_binding_is_a_reference_error() {
        let mut agent = agent();
        let env = new_module_environment(&mut agent);
        env.create_mutable_binding(&mut agent, "x");
        assert!(env.has_binding(&agent, "x"));
        assert!(!env.is_binding_initialized(&agent, "x"));
        let error = env.get_binding_value(&mut agent, "x").unwrap_err();
        assert_eq!(
            error.to_string(&agent),
            "ReferenceError: Cannot access 'x' before initialization."
        );
        env.initialize_binding(&mut agent, "x", Value::Number(1.0));
        assert_eq!(env.get_binding_value(&mut agent, "x"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn immutable_binding_rejects_assignment() {
        let mut agent = agent();
        let env = new_module_environment(&mut agent);
        env.create_immutable_binding(&mut agent, "c");
        env.initialize_binding(&mut agent, "c", Value::Boolean(true));
        let error = env
            .set_mutable_binding(&mut agent, "c", Value::Null)
            .unwrap_err();
        assert_eq!(
            error.to_string(&agent),
            "TypeError: Cannot assign to immutable identifier 'c' in strict mode."
        );
        assert_eq!(env.get_binding_value(&mut agent, "c"), Ok(Value::Boolean(true)));
    }

    #[test]
    fn mutable_binding_accepts_assignment() {
        let mut agent = agent();
        let env = new_module_environment(&mut agent);
        env.create_mutable_binding(&mut agent, "v");
        env.initialize_binding(&mut agent, "v", Value::Undefined);
        env.set_mutable_binding(&mut agent, "v", Value::from_str("set"))
            .unwrap();
        assert_eq!(env.get_binding_value(&mut agent, "v"), Ok(Value::from_str("set")));
        assert!(env.set_mutable_binding(&mut agent, "missing", Value::Null).is_err());
    }
}

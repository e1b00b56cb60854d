// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{cell::RefCell, path::PathBuf, rc::Rc};

use modlink_vm::{
    ecmascript::{
        execution::{Agent, JsResult},
        scripts_and_modules::module::module_semantics::source_text_module_records::SourceTextModule,
        types::Value,
    },
    engine::{ModuleBody, ModuleBodyStep},
};

/// Module body used by the CLI. It does not interpret statements: running
/// the body records the module in the evaluation log, suspends once if the
/// module uses top-level await, and initializes every binding the module
/// declared but left uninitialized to undefined.
pub(crate) struct TracingModuleBody {
    path: PathBuf,
    evaluation_log: Rc<RefCell<Vec<PathBuf>>>,
    suspended: bool,
}

impl TracingModuleBody {
    pub(crate) fn new(path: PathBuf, evaluation_log: Rc<RefCell<Vec<PathBuf>>>) -> Self {
        Self {
            path,
            evaluation_log,
            suspended: false,
        }
    }
}

impl ModuleBody for TracingModuleBody {
    fn resume(
        &mut self,
        agent: &mut Agent,
        module: SourceTextModule,
        completion: JsResult<Value>,
    ) -> ModuleBodyStep {
        if let Err(error) = completion {
            return ModuleBodyStep::Throw(error);
        }
        if module.has_tla(agent) && !self.suspended {
            self.suspended = true;
            if agent.options().print_internals {
                eprintln!("Suspending {} on top-level await", self.path.display());
            }
            return ModuleBodyStep::Await(Value::Undefined);
        }
        if let Some(env) = module.environment(agent) {
            for name in env.binding_names(agent) {
                if !env.is_binding_initialized(agent, &name) {
                    env.initialize_binding(agent, &name, Value::Undefined);
                }
            }
        }
        self.evaluation_log.borrow_mut().push(self.path.clone());
        ModuleBodyStep::Return(Value::Undefined)
    }
}

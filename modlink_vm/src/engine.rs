// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The boundary between module records and whatever executes module code.
//!
//! Module records never interpret statements themselves. A parsed module is
//! handed a [`ModuleBody`] by its embedder, and the evaluator drives that
//! body like a coroutine: every `resume` runs the body until it completes,
//! throws or awaits a value.

use crate::ecmascript::{
    execution::{Agent, JsResult, ModuleEnvironment, agent::JsError},
    scripts_and_modules::module::module_semantics::source_text_module_records::SourceTextModule,
    types::Value,
};

/// The result of running a module body until it stops.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleBodyStep {
    /// The body ran to completion.
    Return(Value),
    /// The body threw.
    Throw(JsError),
    /// The body suspended on an `await` of the given value. Only bodies of
    /// modules containing top-level await may suspend.
    Await(Value),
}

/// Executable code of a Source Text Module Record.
pub trait ModuleBody {
    /// Called once from InitializeEnvironment, after import and exported
    /// local bindings are created and before any module code runs. Hoisted
    /// function declarations are instantiated here.
    fn instantiate_declarations(
        &mut self,
        _agent: &mut Agent,
        _module: SourceTextModule,
        _environment: ModuleEnvironment,
    ) -> JsResult<()> {
        Ok(())
    }

    /// Runs the body until it returns, throws or awaits.
    ///
    /// The first call receives `Ok(Value::Undefined)`. Each later call
    /// receives the settlement of the previously awaited value: `Ok` with the
    /// fulfillment value or `Err` with the rejection reason.
    fn resume(
        &mut self,
        agent: &mut Agent,
        module: SourceTextModule,
        completion: JsResult<Value>,
    ) -> ModuleBodyStep;
}

/// A body with no statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyModuleBody;

impl ModuleBody for EmptyModuleBody {
    fn resume(
        &mut self,
        _agent: &mut Agent,
        _module: SourceTextModule,
        _completion: JsResult<Value>,
    ) -> ModuleBodyStep {
        ModuleBodyStep::Return(Value::Undefined)
    }
}

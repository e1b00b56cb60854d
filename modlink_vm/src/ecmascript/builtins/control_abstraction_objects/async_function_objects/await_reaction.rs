// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ops::{Index, IndexMut};

use crate::{
    ecmascript::{
        builtins::{
            control_abstraction_objects::promise_objects::{
                promise_abstract_operations::{
                    promise_capability_records::PromiseCapability,
                    promise_reaction_records::{PromiseReactionHandler, PromiseReactionType},
                },
                promise_prototype::inner_promise_then,
            },
            promise::Promise,
        },
        execution::{Agent, JsResult, agent::JsError},
        scripts_and_modules::module::module_semantics::source_text_module_records::SourceTextModule,
        types::Value,
    },
    engine::{ModuleBody, ModuleBodyStep},
    heap::{CreateHeapData, Heap, indexes::AwaitReactionIndex},
};

/// The continuation of a module body suspended on a top-level `await`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub(crate) struct AwaitReaction(AwaitReactionIndex);

impl AwaitReaction {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    pub(crate) fn resume(
        self,
        agent: &mut Agent,
        reaction_type: PromiseReactionType,
        value: Value,
    ) {
        // [27.7.5.3 Await ( value )](https://tc39.es/ecma262/#await)
        // 3. d. Resume the suspended evaluation of asyncContext using NormalCompletion(v) as the result of the operation that suspended it.
        // 5. d. Resume the suspended evaluation of asyncContext using ThrowCompletion(reason) as the result of the operation that suspended it.
        let completion = match reaction_type {
            PromiseReactionType::Fulfill => Ok(value),
            PromiseReactionType::Reject => Err(JsError::new(value)),
        };
        let module = agent[self].module;
        let capability = agent[self].capability;
        // A reaction is only ever resumed once.
        let Some(body) = agent[self].body.take() else {
            debug_assert!(false, "Await reaction resumed twice");
            return;
        };
        async_block_start(agent, module, body, capability, completion);
    }
}

/// ### [27.7.5.2 AsyncBlockStart ( promiseCapability, asyncBody, asyncContext )](https://tc39.es/ecma262/#sec-asyncblockstart)
///
/// Runs an asynchronous module body until it completes or suspends. On
/// suspension the body is parked in a new await reaction that resumes it
/// once the awaited value settles.
pub(crate) fn async_block_start(
    agent: &mut Agent,
    module: SourceTextModule,
    mut body: Box<dyn ModuleBody>,
    capability: PromiseCapability,
    completion: JsResult<Value>,
) {
    match body.resume(agent, module, completion) {
        // 2. e. If result is a normal completion, then
        //       i. Perform ! Call(promiseCapability.[[Resolve]], undefined, « undefined »).
        ModuleBodyStep::Return(_) => capability.resolve(agent, Value::Undefined),
        // 2. g. i. Assert: result is a throw completion.
        //       ii. Perform ! Call(promiseCapability.[[Reject]], undefined, « result.[[Value]] »).
        ModuleBodyStep::Throw(err) => capability.reject(agent, err.into_value()),
        ModuleBodyStep::Await(awaited_value) => {
            // [27.7.5.3 Await ( value )](https://tc39.es/ecma262/#await)
            // 1. Let asyncContext be the running execution context.
            let await_reaction = agent.heap.create(AwaitReactionRecord {
                module,
                body: Some(body),
                capability,
            });
            // `handler` corresponds to the `fulfilledClosure` and
            // `rejectedClosure` functions, which resume execution of the body.
            let handler = PromiseReactionHandler::Await(await_reaction);
            // 2. Let promise be ? PromiseResolve(%Promise%, value).
            let promise = Promise::resolve(agent, awaited_value);
            // 7. Perform PerformPromiseThen(promise, onFulfilled, onRejected).
            inner_promise_then(agent, promise, handler, handler, None);
        }
    }
}

pub struct AwaitReactionRecord {
    pub(crate) module: SourceTextModule,
    pub(crate) body: Option<Box<dyn ModuleBody>>,
    pub(crate) capability: PromiseCapability,
}

// dyn ModuleBody doesn't implement Debug
impl std::fmt::Debug for AwaitReactionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitReactionRecord")
            .field("module", &self.module)
            .field("suspended", &self.body.is_some())
            .field("capability", &self.capability)
            .finish()
    }
}

impl Index<AwaitReaction> for Agent {
    type Output = AwaitReactionRecord;

    fn index(&self, index: AwaitReaction) -> &Self::Output {
        &self.heap.await_reactions[index]
    }
}

impl IndexMut<AwaitReaction> for Agent {
    fn index_mut(&mut self, index: AwaitReaction) -> &mut Self::Output {
        &mut self.heap.await_reactions[index]
    }
}

impl Index<AwaitReaction> for Vec<AwaitReactionRecord> {
    type Output = AwaitReactionRecord;

    fn index(&self, index: AwaitReaction) -> &Self::Output {
        self.get(index.get_index())
            .expect("AwaitReaction out of bounds")
    }
}

impl IndexMut<AwaitReaction> for Vec<AwaitReactionRecord> {
    fn index_mut(&mut self, index: AwaitReaction) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("AwaitReaction out of bounds")
    }
}

impl CreateHeapData<AwaitReactionRecord, AwaitReaction> for Heap {
    fn create(&mut self, data: AwaitReactionRecord) -> AwaitReaction {
        self.await_reactions.push(data);
        AwaitReaction(AwaitReactionIndex::last(&self.await_reactions))
    }
}

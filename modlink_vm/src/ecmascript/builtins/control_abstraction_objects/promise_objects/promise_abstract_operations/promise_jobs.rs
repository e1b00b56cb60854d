// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.2 Promise Jobs](https://tc39.es/ecma262/#sec-promise-jobs)

use crate::ecmascript::{
    builtins::{
        control_abstraction_objects::promise_objects::promise_prototype::inner_promise_then,
        promise::Promise,
    },
    execution::{
        Agent, JsResult,
        agent::{InnerJob, Job, JsError},
    },
    scripts_and_modules::module::module_semantics::cyclic_module_records::{
        async_module_execution_fulfilled, async_module_execution_rejected,
    },
    types::Value,
};

use super::{
    promise_capability_records::PromiseCapability,
    promise_reaction_records::{PromiseReaction, PromiseReactionHandler, PromiseReactionType},
};

#[derive(Debug)]
pub(crate) struct PromiseResolveThenableJob {
    promise_to_resolve: Promise,
    thenable: Promise,
}

impl PromiseResolveThenableJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self {
            promise_to_resolve,
            thenable,
        } = self;
        // The following are substeps of point 1 in NewPromiseResolveThenableJob.
        // a. Let resolvingFunctions be CreateResolvingFunctions(promiseToResolve).
        // b. Let thenCallResult be Completion(HostCallJobCallback(then, thenable, « resolvingFunctions.[[Resolve]], resolvingFunctions.[[Reject]] »)).
        // NOTE: The thenable is always a built-in promise, whose then method
        // cannot throw. Calling it amounts to PerformPromiseThen with the
        // resolving functions of promiseToResolve as handlers, which is the
        // same as empty handlers settling the derived capability.
        let promise_capability = PromiseCapability::from_promise(promise_to_resolve, false);
        inner_promise_then(
            agent,
            thenable,
            PromiseReactionHandler::Empty,
            PromiseReactionHandler::Empty,
            Some(promise_capability),
        );
        // d. Return ? thenCallResult.
        Ok(())
    }
}

/// ### [27.2.2.2 NewPromiseResolveThenableJob ( promiseToResolve, thenable, then )](https://tc39.es/ecma262/#sec-newpromiseresolvethenablejob)
pub(crate) fn new_promise_resolve_thenable_job(
    promise_to_resolve: Promise,
    thenable: Promise,
) -> Job {
    // 6. Return the Record { [[Job]]: job, [[Realm]]: thenRealm }.
    Job {
        inner: InnerJob::PromiseResolveThenable(PromiseResolveThenableJob {
            promise_to_resolve,
            thenable,
        }),
    }
}

#[derive(Debug)]
pub(crate) struct PromiseReactionJob {
    reaction: PromiseReaction,
    argument: Value,
}

impl PromiseReactionJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self { reaction, argument } = self;
        let reaction_type = agent[reaction].reaction_type;
        // The following are substeps of point 1 in NewPromiseReactionJob.
        let handler_result = match agent[reaction].handler {
            PromiseReactionHandler::Empty => match reaction_type {
                PromiseReactionType::Fulfill => {
                    // d.i.1. Let handlerResult be NormalCompletion(argument).
                    Ok(argument)
                }
                PromiseReactionType::Reject => {
                    // d.ii.1. Let handlerResult be ThrowCompletion(argument).
                    Err(JsError::new(argument))
                }
            },
            PromiseReactionHandler::Await(await_reaction) => {
                debug_assert!(agent[reaction].capability.is_none());
                await_reaction.resume(agent, reaction_type, argument);
                // [27.7.5.3 Await ( value )](https://tc39.es/ecma262/#await)
                // 5. f. Return undefined.
                Ok(Value::Undefined)
            }
            PromiseReactionHandler::AsyncModule(module) => {
                debug_assert!(agent[reaction].capability.is_none());
                match reaction_type {
                    // [16.2.1.6.1.3.2 ExecuteAsyncModule ( module )](https://tc39.es/ecma262/#sec-execute-async-module)
                    // 4. Let fulfilledClosure be a new Abstract Closure with no parameters that captures module and performs the following steps when called:
                    // a. Perform AsyncModuleExecutionFulfilled(module).
                    PromiseReactionType::Fulfill => async_module_execution_fulfilled(agent, module),
                    // 6. Let rejectedClosure be a new Abstract Closure with parameters (error) that captures module and performs the following steps when called:
                    // a. Perform AsyncModuleExecutionRejected(module, error).
                    PromiseReactionType::Reject => {
                        async_module_execution_rejected(agent, module, JsError::new(argument))
                    }
                }
                // b. Return undefined.
                Ok(Value::Undefined)
            }
        };

        // f. If promiseCapability is undefined, then
        let Some(promise_capability) = agent[reaction].capability else {
            // i. Assert: handlerResult is not an abrupt completion.
            debug_assert!(handler_result.is_ok());
            // ii. Return empty.
            return Ok(());
        };
        match handler_result {
            // h. If handlerResult is an abrupt completion, then
            Err(err) => {
                // i. Return ? Call(promiseCapability.[[Reject]], undefined, « handlerResult.[[Value]] »).
                promise_capability.reject(agent, err.into_value())
            }
            // i. Else,
            Ok(value) => {
                // i. Return ? Call(promiseCapability.[[Resolve]], undefined, « handlerResult.[[Value]] »).
                promise_capability.resolve(agent, value)
            }
        };
        Ok(())
    }
}

/// ### [27.2.2.1 NewPromiseReactionJob ( reaction, argument )](https://tc39.es/ecma262/#sec-newpromisereactionjob)
pub(crate) fn new_promise_reaction_job(reaction: PromiseReaction, argument: Value) -> Job {
    // 4. Return the Record { [[Job]]: job, [[Realm]]: handlerRealm }.
    Job {
        inner: InnerJob::PromiseReaction(PromiseReactionJob { reaction, argument }),
    }
}

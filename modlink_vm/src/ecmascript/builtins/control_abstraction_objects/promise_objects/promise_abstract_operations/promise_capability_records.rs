// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [27.2.1.1 PromiseCapability Records](https://tc39.es/ecma262/#sec-promisecapability-records)

use crate::{
    ecmascript::{
        builtins::promise::{
            Promise,
            data::{PromiseHeapData, PromiseState},
        },
        execution::{
            Agent,
            agent::{ExceptionType, PromiseRejectionTrackerOperation},
        },
        types::Value,
    },
    heap::CreateHeapData,
};

use super::{
    promise_jobs::new_promise_resolve_thenable_job,
    promise_reaction_records::trigger_promise_reactions,
};

/// A promise capability encapsulates a promise, adding methods that are capable
/// of resolving or rejecting that promise.
///
/// NOTE: In the spec, promise capability records contain an object that is
/// usable as a promise, together with its resolve and reject functions. Only
/// built-in promises exist here, so the resolve and reject functions are
/// represented by the methods of this struct.
///
/// The `must_be_unresolved` boolean is used to map the `AlreadyResolved` state
/// of a pair of resolve/reject functions with the promise state. If
/// `must_be_unresolved` is false, the promise counts as already resolved if its
/// state is Fulfilled or Rejected. If true, it also counts as already resolved
/// if it's Pending but `is_resolved` is set to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PromiseCapability {
    pub(crate) promise: Promise,
    pub(crate) must_be_unresolved: bool,
}

impl PromiseCapability {
    /// ### [27.2.1.5 NewPromiseCapability ( C )](https://tc39.es/ecma262/#sec-newpromisecapability)
    ///
    /// NOTE: Our implementation doesn't take C as a parameter, since we don't
    /// support promise subclassing.
    pub fn new(agent: &mut Agent) -> Self {
        Self::from_promise(agent.heap.create(PromiseHeapData::default()), true)
    }

    pub fn from_promise(promise: Promise, must_be_unresolved: bool) -> Self {
        Self {
            promise,
            must_be_unresolved,
        }
    }

    pub fn promise(&self) -> Promise {
        self.promise
    }

    fn is_already_resolved(&self, agent: &Agent) -> bool {
        // If `self.must_be_unresolved` is true, then `alreadyResolved`
        // corresponds with the `is_resolved` flag in PromiseState::Pending.
        // Otherwise, it corresponds to `promise_state` not being Pending.
        match agent[self.promise].promise_state {
            PromiseState::Pending { is_resolved, .. } => {
                if self.must_be_unresolved {
                    is_resolved
                } else {
                    false
                }
            }
            _ => true,
        }
    }

    /// ### [27.2.1.4 FulfillPromise ( promise, value )](https://tc39.es/ecma262/#sec-fulfillpromise)
    pub(crate) fn internal_fulfill(&self, agent: &mut Agent, value: Value) {
        // 1. Assert: The value of promise.[[PromiseState]] is pending.
        // 2. Let reactions be promise.[[PromiseFulfillReactions]].
        let promise_state = &mut agent[self.promise].promise_state;
        let reactions = match promise_state {
            PromiseState::Pending {
                fulfill_reactions, ..
            } => std::mem::take(fulfill_reactions),
            _ => unreachable!(),
        };
        // 3. Set promise.[[PromiseResult]] to value.
        // 4. Set promise.[[PromiseFulfillReactions]] to undefined.
        // 5. Set promise.[[PromiseRejectReactions]] to undefined.
        // 6. Set promise.[[PromiseState]] to FULFILLED.
        *promise_state = PromiseState::Fulfilled {
            promise_result: value.clone(),
        };
        // 7. Perform TriggerPromiseReactions(reactions, value)
        trigger_promise_reactions(agent, reactions, value);
    }

    /// ### [27.2.1.7 RejectPromise ( promise, reason )](https://tc39.es/ecma262/#sec-rejectpromise)
    pub(crate) fn internal_reject(&self, agent: &mut Agent, reason: Value) {
        // 1. Assert: The value of promise.[[PromiseState]] is pending.
        // 2. Let reactions be promise.[[PromiseRejectReactions]].
        let promise_state = &mut agent[self.promise].promise_state;
        let reactions = match promise_state {
            PromiseState::Pending {
                reject_reactions, ..
            } => std::mem::take(reject_reactions),
            _ => unreachable!(),
        };
        // 3. Set promise.[[PromiseResult]] to reason.
        // 4. Set promise.[[PromiseFulfillReactions]] to undefined.
        // 5. Set promise.[[PromiseRejectReactions]] to undefined.
        // 6. Set promise.[[PromiseState]] to REJECTED.
        // NOTE: [[PromiseIsHandled]] for pending promises corresponds to
        // whether [[PromiseRejectReactions]] is not empty.
        let is_handled = !reactions.is_empty();
        *promise_state = PromiseState::Rejected {
            promise_result: reason.clone(),
            is_handled,
        };

        // 7. If promise.[[PromiseIsHandled]] is false, perform HostPromiseRejectionTracker(promise, "reject").
        if !is_handled {
            agent
                .host_hooks
                .promise_rejection_tracker(self.promise, PromiseRejectionTrackerOperation::Reject);
        }

        // 8. Perform TriggerPromiseReactions(reactions, reason)
        trigger_promise_reactions(agent, reactions, reason);
    }

    /// ### [27.2.1.3.2 Promise Resolve Functions](https://tc39.es/ecma262/#sec-promise-resolve-functions)
    pub fn resolve(&self, agent: &mut Agent, resolution: Value) {
        // 1. Let F be the active function object.
        // 2. Assert: F has a [[Promise]] internal slot whose value is an Object.
        // 3. Let promise be F.[[Promise]].
        // 4. Let alreadyResolved be F.[[AlreadyResolved]].
        // 5. If alreadyResolved.[[Value]] is true, return undefined.
        if self.is_already_resolved(agent) {
            return;
        }
        // 6. Set alreadyResolved.[[Value]] to true.
        self.promise.set_already_resolved(agent);

        // 7. If SameValue(resolution, promise) is true, then
        if resolution == Value::Promise(self.promise) {
            // a. Let selfResolutionError be a newly created TypeError object.
            let exception = agent.create_exception_with_static_message(
                ExceptionType::TypeError,
                "Tried to resolve a promise with itself.",
            );
            // b. Perform RejectPromise(promise, selfResolutionError).
            self.internal_reject(agent, exception);
            // c. Return undefined.
            return;
        }

        // 8. If resolution is not an Object, then
        // 9. Let then be Completion(Get(resolution, "then")).
        // 12. If IsCallable(thenAction) is false, then
        // NOTE: Promises are the only thenables.
        let Value::Promise(thenable) = resolution else {
            // a. Perform FulfillPromise(promise, resolution).
            self.internal_fulfill(agent, resolution);
            // b. Return undefined.
            return;
        };

        // 13. Let thenJobCallback be HostMakeJobCallback(thenAction).
        // 14. Let job be NewPromiseResolveThenableJob(promise, resolution, thenJobCallback).
        let job = new_promise_resolve_thenable_job(self.promise, thenable);
        // 15. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        agent.host_hooks.enqueue_promise_job(job);
        // 16. Return undefined.
    }

    /// ### [27.2.1.3.1 Promise Reject Functions](https://tc39.es/ecma262/#sec-promise-reject-functions)
    pub fn reject(&self, agent: &mut Agent, reason: Value) {
        // 1. Let F be the active function object.
        // 2. Assert: F has a [[Promise]] internal slot whose value is an Object.
        // 3. Let promise be F.[[Promise]].
        // 4. Let alreadyResolved be F.[[AlreadyResolved]].
        // 5. If alreadyResolved.[[Value]] is true, return undefined.
        if self.is_already_resolved(agent) {
            return;
        }

        // 7. Perform RejectPromise(promise, reason).
        self.internal_reject(agent, reason);

        // 6. Set alreadyResolved.[[Value]] to true.
        debug_assert!(matches!(
            agent[self.promise].promise_state,
            PromiseState::Rejected { .. }
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecmascript::execution::{DefaultHostHooks, Options};

    fn agent() -> (Agent, &'static DefaultHostHooks) {
        let host_hooks: &DefaultHostHooks = Box::leak(Box::default());
        (Agent::new(Options::default(), host_hooks), host_hooks)
    }

    #[test]
    fn settles_only_once() {
        let (mut agent, _) = agent();
        let capability = PromiseCapability::new(&mut agent);
        capability.resolve(&mut agent, Value::Number(1.0));
        capability.reject(&mut agent, Value::Number(2.0));
        capability.resolve(&mut agent, Value::Number(3.0));
        assert_eq!(
            capability.promise().try_get_result(&agent),
            Some(Ok(Value::Number(1.0)))
        );
    }

    #[test]
    fn resolving_with_a_promise_adopts_its_state_in_a_job() {
        let (mut agent, host_hooks) = agent();
        let inner = PromiseCapability::new(&mut agent);
        let outer = PromiseCapability::new(&mut agent);
        outer.resolve(&mut agent, Value::Promise(inner.promise()));
        // Already resolved, so rejecting is a no-op.
        outer.reject(&mut agent, Value::Null);
        host_hooks.run_promise_jobs(&mut agent).unwrap();
        assert!(outer.promise().is_pending(&agent));

        inner.reject(&mut agent, Value::from_str("boom"));
        host_hooks.run_promise_jobs(&mut agent).unwrap();
        let result = outer.promise().try_get_result(&agent).unwrap();
        assert_eq!(result.unwrap_err().into_value(), Value::from_str("boom"));
    }

    #[test]
    fn resolving_with_itself_is_a_type_error() {
        let (mut agent, _) = agent();
        let capability = PromiseCapability::new(&mut agent);
        capability.resolve(&mut agent, Value::Promise(capability.promise()));
        let error = capability
            .promise()
            .try_get_result(&agent)
            .unwrap()
            .unwrap_err();
        assert_eq!(
            error.to_string(&agent),
            "TypeError: Tried to resolve a promise with itself."
        );
    }
}

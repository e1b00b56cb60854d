// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    ecmascript::{
        builtins::promise::{Promise, data::PromiseState},
        execution::{Agent, agent::PromiseRejectionTrackerOperation},
    },
    heap::CreateHeapData,
};

use super::promise_abstract_operations::{
    promise_capability_records::PromiseCapability,
    promise_jobs::new_promise_reaction_job,
    promise_reaction_records::{PromiseReactionHandler, PromiseReactionRecord, PromiseReactionType},
};

/// Corresponds to [27.2.5.4.1 PerformPromiseThen ( promise, onFulfilled, onRejected \[ , resultCapability \] )](https://tc39.es/ecma262/#sec-performpromisethen)
/// starting at step 7. The handlers are engine-internal continuations, never
/// JavaScript functions.
pub(crate) fn inner_promise_then(
    agent: &mut Agent,
    promise: Promise,
    on_fulfilled: PromiseReactionHandler,
    on_rejected: PromiseReactionHandler,
    result_capability: Option<PromiseCapability>,
) {
    // 7. Let fulfillReaction be the PromiseReaction Record { [[Capability]]: resultCapability, [[Type]]: fulfill, [[Handler]]: onFulfilledJobCallback }.
    let fulfill_reaction = agent.heap.create(PromiseReactionRecord {
        capability: result_capability,
        reaction_type: PromiseReactionType::Fulfill,
        handler: on_fulfilled,
    });
    // 8. Let rejectReaction be the PromiseReaction Record { [[Capability]]: resultCapability, [[Type]]: reject, [[Handler]]: onRejectedJobCallback }.
    let reject_reaction = agent.heap.create(PromiseReactionRecord {
        capability: result_capability,
        reaction_type: PromiseReactionType::Reject,
        handler: on_rejected,
    });

    match &mut agent[promise].promise_state {
        // 9. If promise.[[PromiseState]] is pending, then
        PromiseState::Pending {
            fulfill_reactions,
            reject_reactions,
            ..
        } => {
            // a. Append fulfillReaction to promise.[[PromiseFulfillReactions]].
            fulfill_reactions.push(fulfill_reaction);
            // b. Append rejectReaction to promise.[[PromiseRejectReactions]].
            reject_reactions.push(reject_reaction);
        }
        // 10. Else if promise.[[PromiseState]] is fulfilled, then
        PromiseState::Fulfilled { promise_result } => {
            // a. Let value be promise.[[PromiseResult]].
            let promise_result = promise_result.clone();
            // b. Let fulfillJob be NewPromiseReactionJob(fulfillReaction, value).
            let fulfill_job = new_promise_reaction_job(fulfill_reaction, promise_result);
            // c. Perform HostEnqueuePromiseJob(fulfillJob.[[Job]], fulfillJob.[[Realm]]).
            agent.host_hooks.enqueue_promise_job(fulfill_job);
        }
        // 11. Else,
        PromiseState::Rejected {
            promise_result,
            is_handled,
        } => {
            // a. Assert: The value of promise.[[PromiseState]] is rejected.
            // b. Let reason be promise.[[PromiseResult]].
            let promise_result = promise_result.clone();
            // c. If promise.[[PromiseIsHandled]] is false, perform HostPromiseRejectionTracker(promise, "handle").
            if !*is_handled {
                // 12. Set promise.[[PromiseIsHandled]] to true.
                *is_handled = true;
                agent
                    .host_hooks
                    .promise_rejection_tracker(promise, PromiseRejectionTrackerOperation::Handle);
            }
            // d. Let rejectJob be NewPromiseReactionJob(rejectReaction, reason).
            let reject_job = new_promise_reaction_job(reject_reaction, promise_result);
            // e. Perform HostEnqueuePromiseJob(rejectJob.[[Job]], rejectJob.[[Realm]]).
            agent.host_hooks.enqueue_promise_job(reject_job);
        }
    }
}

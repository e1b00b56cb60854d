// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.6 Properties of Promise Instances](https://tc39.es/ecma262/#sec-properties-of-promise-instances)

pub(crate) mod data;

use std::ops::{Index, IndexMut};

use crate::{
    ecmascript::{
        execution::{
            Agent, JsResult,
            agent::{JsError, PromiseRejectionTrackerOperation},
        },
        types::Value,
    },
    heap::{CreateHeapData, Heap, indexes::PromiseIndex},
};

use data::{PromiseHeapData, PromiseState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Promise(pub(crate) PromiseIndex);

impl Promise {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// Create a new resolved Promise.
    pub fn new_resolved(agent: &mut Agent, value: Value) -> Self {
        agent.heap.create(PromiseHeapData {
            promise_state: PromiseState::Fulfilled {
                promise_result: value,
            },
        })
    }

    /// Create a new rejected Promise. The promise starts out unhandled and
    /// is reported to the host's rejection tracker.
    pub fn new_rejected(agent: &mut Agent, reason: Value) -> Self {
        let promise = agent.heap.create(PromiseHeapData {
            promise_state: PromiseState::Rejected {
                promise_result: reason,
                is_handled: false,
            },
        });
        agent
            .host_hooks
            .promise_rejection_tracker(promise, PromiseRejectionTrackerOperation::Reject);
        promise
    }

    /// ### [27.2.4.7.1 PromiseResolve ( C, x )](https://tc39.es/ecma262/#sec-promise-resolve)
    pub fn resolve(agent: &mut Agent, x: Value) -> Self {
        // 1. If IsPromise(x) is true, then
        if let Value::Promise(promise) = x {
            // a. Let xConstructor be ? Get(x, "constructor").
            // b. If SameValue(xConstructor, C) is true, return x.
            // NOTE: Ignoring subclasses.
            promise
        } else {
            // 2. Let promiseCapability be ? NewPromiseCapability(C).
            // 3. Perform ? Call(promiseCapability.[[Resolve]], undefined, « x »).
            // 4. Return promiseCapability.[[Promise]].
            Self::new_resolved(agent, x)
        }
    }

    pub fn is_pending(self, agent: &Agent) -> bool {
        matches!(agent[self].promise_state, PromiseState::Pending { .. })
    }

    /// Returns the settled result of the promise, or None if it is still
    /// pending.
    pub fn try_get_result(self, agent: &Agent) -> Option<JsResult<Value>> {
        match &agent[self].promise_state {
            PromiseState::Pending { .. } => None,
            PromiseState::Fulfilled { promise_result } => Some(Ok(promise_result.clone())),
            PromiseState::Rejected { promise_result, .. } => {
                Some(Err(JsError::new(promise_result.clone())))
            }
        }
    }

    /// \[\[PromiseIsHandled]]
    pub fn is_handled(self, agent: &Agent) -> bool {
        match &agent[self].promise_state {
            PromiseState::Pending {
                reject_reactions, ..
            } => !reject_reactions.is_empty(),
            PromiseState::Fulfilled { .. } => true,
            PromiseState::Rejected { is_handled, .. } => *is_handled,
        }
    }

    pub(crate) fn set_already_resolved(self, agent: &mut Agent) {
        match &mut agent[self].promise_state {
            PromiseState::Pending { is_resolved, .. } => *is_resolved = true,
            _ => unreachable!(),
        };
    }
}

impl Index<Promise> for Agent {
    type Output = PromiseHeapData;

    fn index(&self, index: Promise) -> &Self::Output {
        &self.heap.promises[index]
    }
}

impl IndexMut<Promise> for Agent {
    fn index_mut(&mut self, index: Promise) -> &mut Self::Output {
        &mut self.heap.promises[index]
    }
}

impl Index<Promise> for Vec<PromiseHeapData> {
    type Output = PromiseHeapData;

    fn index(&self, index: Promise) -> &Self::Output {
        self.get(index.get_index())
            .expect("Promise out of bounds")
    }
}

impl IndexMut<Promise> for Vec<PromiseHeapData> {
    fn index_mut(&mut self, index: Promise) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("Promise out of bounds")
    }
}

impl CreateHeapData<PromiseHeapData, Promise> for Heap {
    fn create(&mut self, data: PromiseHeapData) -> Promise {
        self.promises.push(data);
        Promise(PromiseIndex::last(&self.promises))
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ops::{Index, IndexMut};

use crate::{
    ecmascript::{
        builtins::control_abstraction_objects::async_function_objects::await_reaction::AwaitReaction,
        execution::Agent,
        scripts_and_modules::module::module_semantics::source_text_module_records::SourceTextModule,
        types::Value,
    },
    heap::{CreateHeapData, Heap, indexes::BaseIndex},
};

use super::{promise_capability_records::PromiseCapability, promise_jobs::new_promise_reaction_job};

/// \[\[Type\]\]
///
/// fulfill or reject
///
/// The \[\[Type\]\] is used when \[\[Handler\]\] is empty to allow for
/// behaviour specific to the settlement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseReactionType {
    Fulfill,
    Reject,
}

/// \[\[Handler\]\]
///
/// a JobCallback Record or empty
///
/// No user functions exist, so every handler is an engine-internal
/// continuation.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PromiseReactionHandler {
    /// Resumes a module body suspended on a top-level `await`.
    Await(AwaitReaction),
    /// The onFulfilled and onRejected closures created in step 12 of
    /// ExecuteAsyncModule.
    AsyncModule(SourceTextModule),
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub struct PromiseReactionRecord {
    /// \[\[Capability\]\]
    ///
    /// a PromiseCapability Record or undefined
    ///
    /// The capabilities of the promise for which this record provides a
    /// reaction handler.
    pub(crate) capability: Option<PromiseCapability>,
    /// \[\[Type\]\]
    pub(crate) reaction_type: PromiseReactionType,
    /// \[\[Handler\]\]
    pub(crate) handler: PromiseReactionHandler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PromiseReaction(BaseIndex<PromiseReactionRecord>);

impl PromiseReaction {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }
}

/// ### [27.2.1.8 TriggerPromiseReactions ( reactions, argument )](https://tc39.es/ecma262/#sec-triggerpromisereactions)
pub(crate) fn trigger_promise_reactions(
    agent: &mut Agent,
    reactions: Vec<PromiseReaction>,
    argument: Value,
) {
    // 1. For each element reaction of reactions, do
    for reaction in reactions {
        // a. Let job be NewPromiseReactionJob(reaction, argument).
        let job = new_promise_reaction_job(reaction, argument.clone());
        // b. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        agent.host_hooks.enqueue_promise_job(job);
    }
    // 2. Return unused.
}

impl Index<PromiseReaction> for Agent {
    type Output = PromiseReactionRecord;

    fn index(&self, index: PromiseReaction) -> &Self::Output {
        &self.heap.promise_reaction_records[index]
    }
}

impl IndexMut<PromiseReaction> for Agent {
    fn index_mut(&mut self, index: PromiseReaction) -> &mut Self::Output {
        &mut self.heap.promise_reaction_records[index]
    }
}

impl Index<PromiseReaction> for Vec<PromiseReactionRecord> {
    type Output = PromiseReactionRecord;

    fn index(&self, index: PromiseReaction) -> &Self::Output {
        self.get(index.get_index())
            .expect("PromiseReaction out of bounds")
    }
}

impl IndexMut<PromiseReaction> for Vec<PromiseReactionRecord> {
    fn index_mut(&mut self, index: PromiseReaction) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("PromiseReaction out of bounds")
    }
}

impl CreateHeapData<PromiseReactionRecord, PromiseReaction> for Heap {
    fn create(&mut self, data: PromiseReactionRecord) -> PromiseReaction {
        self.promise_reaction_records.push(data);
        PromiseReaction(BaseIndex::last(&self.promise_reaction_records))
    }
}

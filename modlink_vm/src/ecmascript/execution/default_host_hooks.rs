// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{cell::RefCell, collections::VecDeque, fmt::Debug};

use super::{
    Agent, JsResult,
    agent::{ExceptionType, HostHooks, Job},
};
use crate::ecmascript::scripts_and_modules::{
    HostDefined,
    module::module_semantics::{
        ModuleRequestRecord, cyclic_module_records::GraphLoadingState,
        finish_loading_imported_module, source_text_module_records::SourceTextModule,
    },
};

/// Host hooks for embeddings that only use modules they create themselves,
/// for example Synthetic Module Records or dependency-free source text
/// modules. Every import fails to load with a TypeError.
#[derive(Default)]
pub struct DefaultHostHooks {
    promise_job_queue: RefCell<VecDeque<Job>>,
}

// RefCell doesn't implement Debug
impl Debug for DefaultHostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHostHooks")
            .field("pending_jobs", &self.promise_job_queue.borrow().len())
            .finish()
    }
}

impl DefaultHostHooks {
    pub fn pop_promise_job(&self) -> Option<Job> {
        self.promise_job_queue.borrow_mut().pop_front()
    }

    /// Runs queued promise jobs until the queue is empty.
    pub fn run_promise_jobs(&self, agent: &mut Agent) -> JsResult<()> {
        while let Some(job) = self.pop_promise_job() {
            job.run(agent)?;
        }
        Ok(())
    }
}

impl HostHooks for DefaultHostHooks {
    fn enqueue_promise_job(&self, job: Job) {
        self.promise_job_queue.borrow_mut().push_back(job);
    }

    fn load_imported_module(
        &self,
        agent: &mut Agent,
        referrer: SourceTextModule,
        module_request: &ModuleRequestRecord,
        _host_defined: Option<HostDefined>,
        payload: GraphLoadingState,
    ) {
        let error = agent.throw_exception(
            ExceptionType::TypeError,
            format!("Cannot load module '{}'", module_request.specifier()),
        );
        finish_loading_imported_module(agent, referrer, module_request, payload, Err(error));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod indexes;

use crate::ecmascript::{
    builtins::{
        control_abstraction_objects::{
            async_function_objects::await_reaction::AwaitReactionRecord,
            promise_objects::promise_abstract_operations::promise_reaction_records::PromiseReactionRecord,
        },
        error::ErrorHeapData,
        module::data::ModuleHeapData,
        promise::data::PromiseHeapData,
    },
    execution::environments::ModuleEnvironmentRecord,
    scripts_and_modules::module::module_semantics::{
        cyclic_module_records::GraphLoadingStateRecord,
        source_text_module_records::SourceTextModuleRecord,
        synthetic_module_records::SyntheticModuleRecord,
    },
};

/// Arena storage for every record the module subsystem allocates.
///
/// Records refer to each other through index handles into these vectors,
/// which keeps cyclic module graphs free of reference cycles. Nothing is
/// freed before the heap itself is dropped.
#[derive(Debug, Default)]
pub struct Heap {
    pub(crate) await_reactions: Vec<AwaitReactionRecord>,
    pub(crate) errors: Vec<ErrorHeapData>,
    pub(crate) graph_loading_states: Vec<GraphLoadingStateRecord>,
    pub(crate) module_environments: Vec<ModuleEnvironmentRecord>,
    pub(crate) modules: Vec<ModuleHeapData>,
    pub(crate) promise_reaction_records: Vec<PromiseReactionRecord>,
    pub(crate) promises: Vec<PromiseHeapData>,
    pub(crate) source_text_module_records: Vec<SourceTextModuleRecord>,
    pub(crate) synthetic_module_records: Vec<SyntheticModuleRecord>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }
}

pub trait CreateHeapData<T, F> {
    /// Allocates the given data in the heap and returns a handle to it.
    fn create(&mut self, data: T) -> F;
}

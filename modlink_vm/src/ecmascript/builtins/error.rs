// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [20.5 Error Objects](https://tc39.es/ecma262/#sec-error-objects)

pub(crate) mod data;

use std::ops::{Index, IndexMut};

pub use data::ErrorHeapData;

use crate::{
    ecmascript::{execution::{Agent, agent::ExceptionType}, types::Value},
    heap::{CreateHeapData, Heap, indexes::ErrorIndex},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Error(pub(crate) ErrorIndex);

impl Error {
    pub(crate) const fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// The NativeError constructor this error was created as.
    pub fn kind(self, agent: &Agent) -> ExceptionType {
        agent[self].kind
    }

    pub fn message(self, agent: &Agent) -> Option<&str> {
        agent[self].message.as_deref()
    }
}

impl TryFrom<Value> for Error {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, ()> {
        match value {
            Value::Error(idx) => Ok(idx),
            _ => Err(()),
        }
    }
}

impl Index<Error> for Agent {
    type Output = ErrorHeapData;

    fn index(&self, index: Error) -> &Self::Output {
        &self.heap.errors[index]
    }
}

impl IndexMut<Error> for Agent {
    fn index_mut(&mut self, index: Error) -> &mut Self::Output {
        &mut self.heap.errors[index]
    }
}

impl Index<Error> for Vec<ErrorHeapData> {
    type Output = ErrorHeapData;

    fn index(&self, index: Error) -> &Self::Output {
        self.get(index.get_index())
            .expect("Error out of bounds")
    }
}

impl IndexMut<Error> for Vec<ErrorHeapData> {
    fn index_mut(&mut self, index: Error) -> &mut Self::Output {
        self.get_mut(index.get_index())
            .expect("Error out of bounds")
    }
}

impl CreateHeapData<ErrorHeapData, Error> for Heap {
    fn create(&mut self, data: ErrorHeapData) -> Error {
        self.errors.push(data);
        Error(ErrorIndex::last(&self.errors))
    }
}

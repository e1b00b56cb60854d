// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::ecmascript::execution::agent::ExceptionType;

#[derive(Debug, Clone)]
pub struct ErrorHeapData {
    pub(crate) kind: ExceptionType,
    pub(crate) message: Option<Rc<str>>,
}

impl ErrorHeapData {
    pub(crate) fn new(kind: ExceptionType, message: Option<Rc<str>>) -> Self {
        Self { kind, message }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16 ECMAScript Language: Scripts and Modules](https://tc39.es/ecma262/#sec-ecmascript-language-scripts-and-modules)

pub mod module;

use std::{any::Any, rc::Rc};

/// Opaque host data passed through LoadRequestedModules to the host's
/// HostLoadImportedModule hook and stored on Module Records.
pub type HostDefined = Rc<dyn Any>;

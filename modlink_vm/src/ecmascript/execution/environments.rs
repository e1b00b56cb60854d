// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.1 Environment Records](https://tc39.es/ecma262/#sec-environment-records)
//!
//! Only Module Environment Records exist here: declarative bindings local to
//! a module plus indirect import bindings that forward to another module's
//! environment.

mod module_environment;

pub use module_environment::ModuleEnvironment;
pub(crate) use module_environment::{ModuleEnvironmentRecord, new_module_environment};

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod control_abstraction_objects;
pub mod error;
pub mod module;
pub mod promise;

pub use error::Error;
pub use module::Module;
pub use promise::Promise;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::ecmascript::scripts_and_modules::module::module_semantics::abstract_module_records::AbstractModule;

#[derive(Debug, Clone)]
pub struct ModuleHeapData {
    /// \[\[Module]]
    ///
    /// The Module Record whose exports this namespace exposes.
    pub(crate) module: AbstractModule,
    /// \[\[Exports]]
    ///
    /// A List whose elements are the String values of the exported names
    /// exposed as own properties of this object. The list is ordered as if
    /// an Array of those String values had been sorted using
    /// %Array.prototype.sort% using undefined as comparefn.
    pub(crate) exports: Box<[Rc<str>]>,
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module loading, linking and evaluation for an ECMAScript engine.
//!
//! The crate implements the Cyclic Module Record machinery of
//! [16.2.1](https://tc39.es/ecma262/#sec-module-semantics): loading a module
//! graph through host hooks, linking import and export bindings across
//! strongly connected components, and evaluating module bodies in dependency
//! order, including modules that suspend with top-level await.

pub mod ecmascript;
pub mod engine;
pub mod heap;

pub use heap::Heap;

// Copyright 2025 PRAGMA
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod transaction;

/// First observation seeds the slot; every later observation must equal it.
/// The accumulation discipline shared by the business checkers.
pub(crate) fn observe_same<T: PartialEq + Clone>(slot: &mut Option<T>, value: &T) -> bool {
    match slot {
        None => {
            *slot = Some(value.clone());
            true
        }
        Some(seeded) => seeded == value,
    }
}

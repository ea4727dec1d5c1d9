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

/// A time-decay schedule attached to a pay-to-key-hash script: `locked`
/// units of an asset unlock in `cycle_count` equal installments, one every
/// `cycle_height` blocks.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttenuationParam {
    pub locked: u64,
    pub cycle_count: u64,
    pub cycle_height: u64,
}

impl AttenuationParam {
    /// Model validation against the supply the schedule applies to. The
    /// schedule must lock a positive quantity no larger than the supply and
    /// release at least one unit per cycle.
    pub fn check_model_param(&self, max_supply: u64) -> bool {
        self.locked > 0
            && self.cycle_count > 0
            && self.cycle_height > 0
            && self.cycle_count <= self.locked
            && self.locked <= max_supply
    }
}

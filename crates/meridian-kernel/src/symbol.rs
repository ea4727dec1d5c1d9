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

use crate::transaction::transaction_version;
use std::fmt;

pub const SYMBOL_MAX_LEN: usize = 64;

/// Tickers reserved for the base currency; no asset may use them.
pub const FORBIDDEN_SYMBOLS: &[&str] = &["MER", "MERIDIAN"];

/// A business-object identifier: an asset ticker, a certificate symbol, a
/// token name or an identity name.
///
/// A symbol optionally carries a domain component, the segment before the
/// first `.` separator: the symbol `PRAGMA.GOLD` sits under the domain
/// `PRAGMA`. Domain certificates are keyed by that component alone.
#[derive(
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The domain component, present only when the symbol contains a `.`
    /// separator with a non-empty prefix.
    pub fn domain(&self) -> Option<Domain> {
        match self.0.split_once('.') {
            Some((domain, _)) if !domain.is_empty() => Some(Domain(domain.to_owned())),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(symbol: &str) -> Self {
        Self(symbol.to_owned())
    }
}

/// The namespace prefix of a dotted symbol. A domain certificate's symbol is
/// a bare domain, so the two compare directly.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a symbol is the bare name of this domain.
    pub fn matches(&self, symbol: &Symbol) -> bool {
        self.0 == symbol.as_str()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_forbidden_symbol(symbol: &Symbol) -> bool {
    FORBIDDEN_SYMBOLS.contains(&symbol.as_str())
}

/// Asset-symbol syntax. The nova versions tightened the charset to uppercase
/// alphanumerics plus the domain separator.
pub fn is_valid_asset_symbol(symbol: &Symbol, tx_version: u32) -> bool {
    let s = symbol.as_str();
    if s.is_empty() || s.len() > SYMBOL_MAX_LEN {
        return false;
    }
    if tx_version >= transaction_version::CHECK_NOVA_FEATURE {
        s.len() >= 3
            && !s.starts_with('.')
            && !s.ends_with('.')
            && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.')
    } else {
        true
    }
}

/// Identity-symbol syntax. Mainnet (`strict`) additionally requires at least
/// four characters, one of them alphabetic.
pub fn is_valid_did_symbol(symbol: &Symbol, strict: bool) -> bool {
    let s = symbol.as_str();
    if s.is_empty()
        || s.len() > SYMBOL_MAX_LEN
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
    {
        return false;
    }
    if strict {
        s.len() >= 4 && s.chars().any(|c| c.is_ascii_alphabetic())
    } else {
        true
    }
}

/// Token-symbol syntax.
pub fn is_valid_mit_symbol(symbol: &Symbol) -> bool {
    let s = symbol.as_str();
    s.len() >= 3
        && s.len() <= SYMBOL_MAX_LEN
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
}

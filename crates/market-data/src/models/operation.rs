use std::fmt;

use serde::{Deserialize, Serialize};

/// The logical request a provider can serve.
///
/// The first four are the uniform operations every adapter is expected to
/// expose; `TokenInfo` is optional and advertised through capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Market,
    OnChain,
    Technical,
    Social,
    TokenInfo,
}

impl Operation {
    /// The four operations that make up a token data bundle.
    pub const CORE: [Operation; 4] = [
        Operation::Market,
        Operation::OnChain,
        Operation::Technical,
        Operation::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::OnChain => "on_chain",
            Self::Technical => "technical",
            Self::Social => "social",
            Self::TokenInfo => "token_info",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

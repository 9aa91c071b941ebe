use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// One of the retail chains whose catalogs are compared.
///
/// Variant order is the canonical store priority used for every tie-break
/// (best-deal picks, ranking ties, combination ordering), so `Ord` on this
/// type is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Store {
    #[serde(rename = "IGA")]
    Iga,
    #[serde(rename = "Woolworths")]
    Woolworths,
    #[serde(rename = "Coles")]
    Coles,
}

impl Store {
    /// Every store, in canonical priority order.
    pub const ALL: [Store; 3] = [Store::Iga, Store::Woolworths, Store::Coles];

    /// Display name as stored in the catalog and the vector index payload.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Store::Iga => "IGA",
            Store::Woolworths => "Woolworths",
            Store::Coles => "Coles",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Store {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iga" => Ok(Store::Iga),
            "woolworths" => Ok(Store::Woolworths),
            "coles" => Ok(Store::Coles),
            _ => Err(CoreError::InvalidStore(s.to_string())),
        }
    }
}

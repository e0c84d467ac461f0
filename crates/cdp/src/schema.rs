//! Schema domain types.
//! <https://chromedevtools.github.io/devtools-protocol/tot/Schema/>

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub version: String,
}

impl Domain {
    pub fn new(name: &str, version: &str) -> Domain {
        Domain {
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetDomainsResult {
    pub domains: Vec<Domain>,
}

//! Region-keyed API credential.

use std::fmt;

use crate::config::{mask_secret, Region};

/// API key rewritten for a regional endpoint.
///
/// The stored key's first two characters are replaced by the region code,
/// so one stored secret can address both regions.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    region: Region,
}

impl Credential {
    /// Derive the credential for `region` from a stored API key.
    pub fn for_region(api_key: &str, region: Region) -> Self {
        let rest: String = api_key.chars().skip(2).collect();
        Self {
            secret: format!("{}{}", region.code(), rest),
            region,
        }
    }

    /// The transformed secret, for use in request headers.
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// The region this credential addresses.
    pub fn region(&self) -> Region {
        self.region
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &mask_secret(&self.secret))
            .field("region", &self.region)
            .finish()
    }
}

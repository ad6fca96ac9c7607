use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Predefined ACLs accepted by the GCS JSON API on object insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredefinedAcl {
    AuthenticatedRead,
    BucketOwnerFullControl,
    BucketOwnerRead,
    #[default]
    Private,
    ProjectPrivate,
    PublicRead,
}

impl PredefinedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredefinedAcl::AuthenticatedRead => "authenticatedRead",
            PredefinedAcl::BucketOwnerFullControl => "bucketOwnerFullControl",
            PredefinedAcl::BucketOwnerRead => "bucketOwnerRead",
            PredefinedAcl::Private => "private",
            PredefinedAcl::ProjectPrivate => "projectPrivate",
            PredefinedAcl::PublicRead => "publicRead",
        }
    }
}

impl fmt::Display for PredefinedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredefinedAcl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticatedRead" => Ok(PredefinedAcl::AuthenticatedRead),
            "bucketOwnerFullControl" => Ok(PredefinedAcl::BucketOwnerFullControl),
            "bucketOwnerRead" => Ok(PredefinedAcl::BucketOwnerRead),
            "private" => Ok(PredefinedAcl::Private),
            "projectPrivate" => Ok(PredefinedAcl::ProjectPrivate),
            "publicRead" => Ok(PredefinedAcl::PublicRead),
            other => Err(format!("unknown predefined ACL '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_private() {
        assert_eq!(PredefinedAcl::default(), PredefinedAcl::Private);
    }

    #[test]
    fn test_parse_matches_display() {
        for acl in [
            PredefinedAcl::AuthenticatedRead,
            PredefinedAcl::BucketOwnerFullControl,
            PredefinedAcl::BucketOwnerRead,
            PredefinedAcl::Private,
            PredefinedAcl::ProjectPrivate,
            PredefinedAcl::PublicRead,
        ] {
            assert_eq!(acl.to_string().parse::<PredefinedAcl>().unwrap(), acl);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("public-read".parse::<PredefinedAcl>().is_err());
    }

    #[test]
    fn test_serde_uses_api_spelling() {
        let json = serde_json::to_string(&PredefinedAcl::PublicRead).unwrap();
        assert_eq!(json, "\"publicRead\"");
    }
}

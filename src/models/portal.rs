// src/models/portal.rs

//! Supported property portals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A property portal whose search pages can be scraped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    /// propertyfinder.ae
    #[default]
    PropertyFinder,
    /// bayut.com
    Bayut,
}

impl Portal {
    pub fn name(&self) -> &'static str {
        match self {
            Portal::PropertyFinder => "propertyfinder",
            Portal::Bayut => "bayut",
        }
    }

    /// Origin used to resolve relative listing links.
    pub fn origin(&self) -> &'static str {
        match self {
            Portal::PropertyFinder => "https://www.propertyfinder.ae",
            Portal::Bayut => "https://www.bayut.com",
        }
    }

    /// Land-for-sale search used when no base URL is configured.
    pub fn default_search_url(&self) -> &'static str {
        match self {
            Portal::PropertyFinder => {
                "https://www.propertyfinder.ae/en/search?c=1&t=5&fu=0&ob=mr"
            }
            Portal::Bayut => "https://www.bayut.com/for-sale/residential-plots/uae/page-{page}/",
        }
    }

    /// Substring identifying the portal's own image CDN in `<img src>`.
    pub fn image_host(&self) -> &'static str {
        match self {
            Portal::PropertyFinder => "propertyfinder.ae",
            Portal::Bayut => "bayut.com",
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Portal {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "propertyfinder" | "pf" => Ok(Portal::PropertyFinder),
            "bayut" => Ok(Portal::Bayut),
            other => Err(AppError::config(format!("Unknown portal '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("PropertyFinder".parse::<Portal>().unwrap(), Portal::PropertyFinder);
        assert_eq!("bayut".parse::<Portal>().unwrap(), Portal::Bayut);
        assert!("zillow".parse::<Portal>().is_err());
    }

    #[test]
    fn test_display_matches_serde_name() {
        let json = serde_json::to_string(&Portal::Bayut).unwrap();
        assert_eq!(json, format!("\"{}\"", Portal::Bayut));
    }
}

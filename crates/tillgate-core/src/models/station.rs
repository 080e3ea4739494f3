use std::fmt;

use serde::{Deserialize, Serialize};

/// Point-of-sale terminal an operator logs in at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    /// Branch the station belongs to. `None` for a single-branch install
    /// that was never synchronized.
    #[serde(default)]
    pub branch: Option<String>,
}

impl Station {
    pub fn new(name: impl Into<String>, branch: Option<String>) -> Self {
        Self {
            name: name.into(),
            branch,
        }
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(ref branch) => write!(f, "{} ({})", self.name, branch),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_display() {
        assert_eq!(Station::new("till-1", None).to_string(), "till-1");
        assert_eq!(
            Station::new("till-1", Some("Downtown".to_string())).to_string(),
            "till-1 (Downtown)"
        );
    }
}

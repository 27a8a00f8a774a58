//! Series resolution, the granularity a provider aggregates readings at.

use std::fmt;

/// Granularity of an energy series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyResolution {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Annual,
}

impl EnergyResolution {
    /// Name used by GraphQL style APIs (`HOURLY`, `DAILY`, ...).
    pub const fn as_upper(&self) -> &'static str {
        match self {
            EnergyResolution::Hourly => "HOURLY",
            EnergyResolution::Daily => "DAILY",
            EnergyResolution::Weekly => "WEEKLY",
            EnergyResolution::Monthly => "MONTHLY",
            EnergyResolution::Annual => "ANNUAL",
        }
    }
}

impl fmt::Display for EnergyResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_graphql_enum() {
        assert_eq!(EnergyResolution::Monthly.to_string(), "MONTHLY");
        assert_eq!(EnergyResolution::Hourly.to_string(), "HOURLY");
    }
}

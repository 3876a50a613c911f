//! Metric and marketplace keys shared across the data model

use serde::{Deserialize, Serialize};

/// A tracked business metric.
///
/// Net Ordered Units is the derived headline metric; the other three are
/// the independently observed drivers whose product defines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    NetOrderedUnits,
    Transits,
    TransitConversion,
    Upo,
}

impl Metric {
    /// All known metrics, in sheet order.
    pub const ALL: [Metric; 4] = [
        Metric::NetOrderedUnits,
        Metric::Transits,
        Metric::TransitConversion,
        Metric::Upo,
    ];

    /// Driver metrics forecast independently; their product is Net Ordered Units.
    pub const DRIVERS: [Metric; 3] = [Metric::Transits, Metric::TransitConversion, Metric::Upo];

    /// Canonical label as it appears in sheet section headers.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::NetOrderedUnits => "Net Ordered Units",
            Metric::Transits => "Transits",
            Metric::TransitConversion => "Transit Conversion",
            Metric::Upo => "UPO",
        }
    }

    /// Match a trimmed cell label against the known metric names.
    pub fn from_label(label: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.label() == label)
    }

    /// Rates are averaged across marketplaces; counts are summed.
    pub fn is_rate(&self) -> bool {
        matches!(self, Metric::TransitConversion | Metric::Upo)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A marketplace row key.
///
/// EU5 is the aggregate of the five national marketplaces and is always
/// derived, never taken from an authored sheet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Marketplace {
    Uk,
    De,
    Fr,
    It,
    Es,
    Eu5,
}

impl Marketplace {
    /// All marketplaces, nationals first.
    pub const ALL: [Marketplace; 6] = [
        Marketplace::Uk,
        Marketplace::De,
        Marketplace::Fr,
        Marketplace::It,
        Marketplace::Es,
        Marketplace::Eu5,
    ];

    /// The five national marketplaces that EU5 aggregates.
    pub const NATIONAL: [Marketplace; 5] = [
        Marketplace::Uk,
        Marketplace::De,
        Marketplace::Fr,
        Marketplace::It,
        Marketplace::Es,
    ];

    /// Two/three-letter code as it appears in the MP column.
    pub fn code(&self) -> &'static str {
        match self {
            Marketplace::Uk => "UK",
            Marketplace::De => "DE",
            Marketplace::Fr => "FR",
            Marketplace::It => "IT",
            Marketplace::Es => "ES",
            Marketplace::Eu5 => "EU5",
        }
    }

    /// Match a trimmed cell label against the known marketplace codes.
    pub fn from_code(code: &str) -> Option<Marketplace> {
        Marketplace::ALL.into_iter().find(|m| m.code() == code)
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::profile::normalize_fraction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalBasis {
    pub fraction: String,
    pub activity: String,
    pub citation: String,
}

/// Lookup from activity sector to the regulatory fraction that governs it.
///
/// Independent of the scoring math: it only feeds the legal narrative of an
/// explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalBasisCatalog {
    sectors: HashMap<String, LegalBasis>,
}

impl Default for LegalBasisCatalog {
    fn default() -> Self {
        Self::new(build_legal_basis_table())
    }
}

fn normalize_sector(sector: &str) -> String {
    sector.trim().to_lowercase().replace([' ', '-'], "_")
}

fn entry(fraction: &str, activity: &str) -> LegalBasis {
    LegalBasis {
        fraction: fraction.to_string(),
        activity: activity.to_string(),
        citation: format!("Art. 17, fraction {}", fraction),
    }
}

fn build_legal_basis_table() -> Vec<(&'static str, LegalBasis)> {
    vec![
        ("gaming", entry("I", "Games, contests and lotteries")),
        ("lotteries", entry("I", "Games, contests and lotteries")),
        ("credit_cards", entry("II", "Issuance of non-bank credit or service cards")),
        ("prepaid_cards", entry("II", "Issuance of prepaid cards and stored value instruments")),
        ("travellers_cheques", entry("III", "Issuance of travellers cheques")),
        ("loans", entry("IV", "Habitual granting of loans or credit")),
        ("real_estate", entry("V", "Construction, development and sale of real estate")),
        ("precious_metals", entry("VI", "Trade in precious metals, stones and jewellery")),
        ("jewelry", entry("VI", "Trade in precious metals, stones and jewellery")),
        ("art", entry("VII", "Sale and auction of works of art")),
        ("vehicles", entry("VIII", "Distribution and sale of land, sea and air vehicles")),
        ("armouring", entry("IX", "Armouring of vehicles and real estate")),
        ("cash_transport", entry("X", "Custody and transport of cash and valuables")),
        (
            "professional_services",
            entry("XI", "Independent professional services on behalf of clients"),
        ),
        ("notary", entry("XII", "Services of public notaries and brokers")),
        ("donations", entry("XIII", "Receipt of donations by non-profit organisations")),
        ("customs", entry("XIV", "Customs brokerage for foreign trade operations")),
        ("leasing", entry("XV", "Leasing of real estate")),
        ("virtual_assets", entry("XVI", "Habitual exchange of virtual assets")),
    ]
}

impl LegalBasisCatalog {
    pub fn new(entries: Vec<(&str, LegalBasis)>) -> Self {
        let sectors = entries
            .into_iter()
            .map(|(sector, basis)| (normalize_sector(sector), basis))
            .collect();
        LegalBasisCatalog { sectors }
    }

    pub fn for_sector(&self, sector: &str) -> Option<&LegalBasis> {
        self.sectors.get(&normalize_sector(sector))
    }

    /// First sector entry governed by the given fraction.
    pub fn for_fraction(&self, fraction: &str) -> Option<&LegalBasis> {
        let key = normalize_fraction(fraction);
        let mut matches: Vec<(&String, &LegalBasis)> = self
            .sectors
            .iter()
            .filter(|(_, b)| b.fraction == key)
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches.first().map(|(_, b)| *b)
    }

    /// Resolve a legal basis: the sector mapping wins, the fraction code is the fallback.
    pub fn resolve(&self, sector: Option<&str>, fraction: &str) -> Option<&LegalBasis> {
        sector
            .and_then(|s| self.for_sector(s))
            .or_else(|| self.for_fraction(fraction))
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

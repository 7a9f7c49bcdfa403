//! Asset-id -> provider-symbol resolution. Kept as a narrow trait so the
//! access service never hardcodes a mapping scheme; production code can
//! back it with a reference-data table while tests use the static map.

use std::collections::BTreeMap;

use crate::error::AccessError;

pub trait SymbolMapper: Send + Sync {
    /// Resolves a canonical asset key (a `MarketDataId::as_canonical_key`)
    /// to the symbol the provider expects. Fails closed: an unmapped asset
    /// is a request error, never a silently skipped column.
    fn provider_symbol(&self, asset: &str) -> Result<String, AccessError>;
}

/// Fixed asset -> provider-symbol table, the common case for a small,
/// curated instrument universe.
#[derive(Debug, Clone, Default)]
pub struct StaticSymbolMapper {
    map: BTreeMap<String, String>,
}

impl StaticSymbolMapper {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self { map }
    }

    pub fn insert(&mut self, asset: impl Into<String>, provider_symbol: impl Into<String>) -> &mut Self {
        self.map.insert(asset.into(), provider_symbol.into());
        self
    }
}

impl SymbolMapper for StaticSymbolMapper {
    fn provider_symbol(&self, asset: &str) -> Result<String, AccessError> {
        self.map
            .get(asset)
            .cloned()
            .ok_or_else(|| AccessError::UnmappedAsset(asset.to_string()))
    }
}

/// Identity mapper for providers whose symbols already match the
/// canonical asset key (the common fixture/test case).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySymbolMapper;

impl SymbolMapper for IdentitySymbolMapper {
    fn provider_symbol(&self, asset: &str) -> Result<String, AccessError> {
        Ok(asset.to_string())
    }
}

use crate::catalog::EntityCatalog;
use crate::error::CoreResult;
use std::collections::BTreeSet;

/// Items the user has marked as evidence / findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flagged: BTreeSet<String>,
}

impl FlagSet {
    pub fn flag(&mut self, catalog: &EntityCatalog, item_id: &str) -> CoreResult<bool> {
        catalog.require_item(item_id)?;
        Ok(self.flagged.insert(item_id.to_string()))
    }

    pub fn unflag(&mut self, catalog: &EntityCatalog, item_id: &str) -> CoreResult<bool> {
        catalog.require_item(item_id)?;
        Ok(self.flagged.remove(item_id))
    }

    /// Returns the new flag state.
    pub fn toggle(&mut self, catalog: &EntityCatalog, item_id: &str) -> CoreResult<bool> {
        if self.unflag(catalog, item_id)? {
            Ok(false)
        } else {
            self.flagged.insert(item_id.to_string());
            Ok(true)
        }
    }

    pub fn is_flagged(&self, item_id: &str) -> bool {
        self.flagged.contains(item_id)
    }

    pub fn len(&self) -> usize {
        self.flagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flagged.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.flagged.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.flagged.clear();
    }
}

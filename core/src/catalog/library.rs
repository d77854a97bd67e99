use super::model::{Difficulty, ScenarioDefinition, ScenarioLibrary};
use super::EntityCatalog;
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const LIBRARY_VERSION: &str = "pbq_scenarios_v1";

pub fn library_v1() -> CoreResult<ScenarioLibrary> {
    let json = include_str!("scenarios_v1.json");
    let lib: ScenarioLibrary = serde_json::from_str(json)?;
    if lib.library_version != LIBRARY_VERSION {
        return Err(CoreError::InvalidCatalog(format!(
            "embedded library is not {}",
            LIBRARY_VERSION
        )));
    }
    let mut seen = BTreeSet::new();
    for s in &lib.scenarios {
        if !seen.insert(s.id.as_str()) {
            return Err(CoreError::InvalidCatalog(format!(
                "duplicate scenario id {}",
                s.id
            )));
        }
    }
    Ok(lib)
}

impl ScenarioLibrary {
    pub fn get(&self, id: &str) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&ScenarioDefinition> {
        self.scenarios
            .iter()
            .filter(|s| s.difficulty == difficulty)
            .collect()
    }

    pub fn catalog(&self, id: &str) -> CoreResult<Arc<EntityCatalog>> {
        let def = self.get(id).ok_or_else(|| CoreError::UnknownId {
            kind: "scenario",
            id: id.to_string(),
        })?;
        Ok(Arc::new(EntityCatalog::from_definition(def)?))
    }
}

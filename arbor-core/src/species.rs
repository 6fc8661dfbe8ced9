//! Families, leaves properties, species and the registry that resolves their
//! names at setup time.
//!
//! Everything that can go wrong with configuration goes wrong here, as a
//! [`ConfigError`]. Once a [`Species`] exists its growth logic and cell kit are
//! guaranteed present, so the engines never fail on configuration.

use std::sync::Arc;

use crate::cells::CellKit;
use crate::config::{FamilyDef, LeavesDef, LightThresholds, SpeciesConfig, SpeciesDef};
use crate::error::ConfigError;
use crate::growth::GrowthLogicKit;
use crate::types::{FamilyId, LeavesId, SpeciesId};

/// A wood type. Branches of one family connect to each other.
#[derive(Clone, Debug, PartialEq)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub primary_thickness: u8,
    pub secondary_thickness: u8,
    pub max_branch_radius: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeavesProperties {
    id: LeavesId,
    name: String,
    family: Family,
    cell_kit: Arc<CellKit>,
    light: LightThresholds,
}

impl LeavesProperties {
    pub fn id(&self) -> LeavesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> &Family {
        &self.family
    }

    pub fn cell_kit(&self) -> &CellKit {
        &self.cell_kit
    }

    pub fn light(&self) -> &LightThresholds {
        &self.light
    }
}

#[derive(Clone, Debug)]
pub struct Species {
    id: SpeciesId,
    name: String,
    leaves: LeavesProperties,
    logic: GrowthLogicKit,
    config: SpeciesConfig,
}

impl Species {
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> &Family {
        self.leaves.family()
    }

    pub fn leaves(&self) -> &LeavesProperties {
        &self.leaves
    }

    pub fn logic(&self) -> &GrowthLogicKit {
        &self.logic
    }

    pub fn config(&self) -> &SpeciesConfig {
        &self.config
    }
}

/// Owns every registered family, leaves type, species and custom cell kit.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    families: Vec<Family>,
    leaves: Vec<LeavesProperties>,
    species: Vec<Species>,
    cell_kits: Vec<Arc<CellKit>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a custom kit available to [`Registry::register_leaves`] by name.
    pub fn register_cell_kit(&mut self, kit: CellKit) -> Result<(), ConfigError> {
        if self.find_cell_kit(kit.name()).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "cell kit",
                name: kit.name().to_string(),
            });
        }
        self.cell_kits.push(Arc::new(kit));
        Ok(())
    }

    pub fn register_family(&mut self, def: FamilyDef) -> Result<FamilyId, ConfigError> {
        if self.family_by_name(&def.name).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "family",
                name: def.name,
            });
        }
        let valid = def.primary_thickness >= 1
            && def.secondary_thickness >= def.primary_thickness
            && def.max_branch_radius >= def.secondary_thickness;
        if !valid {
            return Err(ConfigError::InvalidThickness {
                family: def.name,
                primary: def.primary_thickness,
                secondary: def.secondary_thickness,
                max: def.max_branch_radius,
            });
        }

        let id = FamilyId(self.families.len() as u16);
        tracing::debug!(family = %def.name, ?id, "registered family");
        self.families.push(Family {
            id,
            name: def.name,
            primary_thickness: def.primary_thickness,
            secondary_thickness: def.secondary_thickness,
            max_branch_radius: def.max_branch_radius,
        });
        Ok(id)
    }

    pub fn register_leaves(&mut self, def: LeavesDef) -> Result<LeavesId, ConfigError> {
        if self.leaves_by_name(&def.name).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "leaves",
                name: def.name,
            });
        }
        let family = self
            .family_by_name(&def.family)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFamily(def.family.clone()))?;
        let cell_kit = match self.find_cell_kit(&def.cell_kit) {
            Some(kit) => kit,
            None => CellKit::by_name(&def.cell_kit)
                .map(Arc::new)
                .ok_or_else(|| ConfigError::UnknownCellKit(def.cell_kit.clone()))?,
        };

        let id = LeavesId(self.leaves.len() as u16);
        tracing::debug!(leaves = %def.name, kit = %cell_kit.name(), ?id, "registered leaves");
        self.leaves.push(LeavesProperties {
            id,
            name: def.name,
            family,
            cell_kit,
            light: def.light,
        });
        Ok(id)
    }

    pub fn register_species(&mut self, def: SpeciesDef) -> Result<SpeciesId, ConfigError> {
        if self.species_by_name(&def.name).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "species",
                name: def.name,
            });
        }
        let family = self
            .family_by_name(&def.family)
            .ok_or_else(|| ConfigError::UnknownFamily(def.family.clone()))?
            .id;
        let leaves = self
            .leaves_by_name(&def.leaves)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownLeaves(def.leaves.clone()))?;
        if leaves.family.id != family {
            return Err(ConfigError::FamilyMismatch {
                species: def.name,
                leaves: def.leaves,
            });
        }
        let logic = GrowthLogicKit::by_name(&def.growth_logic)
            .ok_or_else(|| ConfigError::UnknownGrowthLogic(def.growth_logic.clone()))?;

        let id = SpeciesId(self.species.len() as u16);
        tracing::debug!(species = %def.name, logic = logic.name, ?id, "registered species");
        self.species.push(Species {
            id,
            name: def.name,
            leaves,
            logic,
            config: def.config,
        });
        Ok(id)
    }

    pub fn family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(id.0 as usize)
    }

    pub fn leaves(&self, id: LeavesId) -> Option<&LeavesProperties> {
        self.leaves.get(id.0 as usize)
    }

    pub fn species(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0 as usize)
    }

    pub fn family_by_name(&self, name: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.name == name)
    }

    pub fn leaves_by_name(&self, name: &str) -> Option<&LeavesProperties> {
        self.leaves.iter().find(|l| l.name == name)
    }

    pub fn species_by_name(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    /// First registered leaves type of a family.
    pub fn leaves_for_family(&self, family: FamilyId) -> Option<&LeavesProperties> {
        self.leaves.iter().find(|l| l.family.id == family)
    }

    fn find_cell_kit(&self, name: &str) -> Option<Arc<CellKit>> {
        self.cell_kits.iter().find(|k| k.name() == name).cloned()
    }

    /// A registry with the four built-in tree types: `oak`, `spruce`,
    /// `dark_oak` and `willow`, each a family, leaves and species of that name.
    pub fn with_builtin_species() -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, kit, logic) in [
            ("oak", "deciduous", "default"),
            ("spruce", "conifer", "conifer"),
            ("dark_oak", "dark_oak", "dark_oak"),
            ("willow", "deciduous", "weeping"),
        ] {
            registry.register_family(FamilyDef {
                name: name.to_string(),
                ..FamilyDef::default()
            })?;
            registry.register_leaves(LeavesDef {
                name: name.to_string(),
                family: name.to_string(),
                cell_kit: kit.to_string(),
                ..LeavesDef::default()
            })?;
            registry.register_species(SpeciesDef {
                name: name.to_string(),
                family: name.to_string(),
                leaves: name.to_string(),
                growth_logic: logic.to_string(),
                config: SpeciesConfig::default(),
            })?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::{CellSolver, LeafCluster};
    use glam::IVec3;

    fn family(name: &str) -> FamilyDef {
        FamilyDef {
            name: name.to_string(),
            ..FamilyDef::default()
        }
    }

    fn leaves(name: &str, family: &str, kit: &str) -> LeavesDef {
        LeavesDef {
            name: name.to_string(),
            family: family.to_string(),
            cell_kit: kit.to_string(),
            ..LeavesDef::default()
        }
    }

    #[test]
    fn builtin_species_register_cleanly() {
        let registry = Registry::with_builtin_species().unwrap();
        let spruce = registry.species_by_name("spruce").unwrap();
        assert_eq!(spruce.logic().name, "conifer");
        assert_eq!(spruce.leaves().cell_kit().name(), "conifer");
        assert_eq!(spruce.family().name, "spruce");
        assert_eq!(registry.species(spruce.id()).unwrap().name(), "spruce");
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let mut registry = Registry::new();
        registry.register_family(family("oak")).unwrap();

        assert_eq!(
            registry.register_leaves(leaves("oak", "birch", "deciduous")),
            Err(ConfigError::UnknownFamily("birch".to_string()))
        );
        assert_eq!(
            registry.register_leaves(leaves("oak", "oak", "palm")),
            Err(ConfigError::UnknownCellKit("palm".to_string()))
        );

        registry.register_leaves(leaves("oak", "oak", "deciduous")).unwrap();
        let err = registry
            .register_species(SpeciesDef {
                name: "oak".to_string(),
                family: "oak".to_string(),
                leaves: "oak".to_string(),
                growth_logic: "spiral".to_string(),
                config: SpeciesConfig::default(),
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownGrowthLogic("spiral".to_string()));
    }

    #[test]
    fn duplicate_and_invalid_families_are_rejected() {
        let mut registry = Registry::new();
        registry.register_family(family("oak")).unwrap();
        assert!(matches!(
            registry.register_family(family("oak")),
            Err(ConfigError::Duplicate { kind: "family", .. })
        ));

        let thin = FamilyDef {
            name: "thin".to_string(),
            primary_thickness: 0,
            ..FamilyDef::default()
        };
        assert!(matches!(
            registry.register_family(thin),
            Err(ConfigError::InvalidThickness { .. })
        ));
    }

    #[test]
    fn species_and_leaves_must_share_a_family() {
        let mut registry = Registry::new();
        registry.register_family(family("oak")).unwrap();
        registry.register_family(family("birch")).unwrap();
        registry.register_leaves(leaves("birch", "birch", "deciduous")).unwrap();

        let err = registry
            .register_species(SpeciesDef {
                name: "oak".to_string(),
                family: "oak".to_string(),
                leaves: "birch".to_string(),
                ..SpeciesDef::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::FamilyMismatch { .. }));
    }

    #[test]
    fn custom_cell_kits_resolve_before_builtins() {
        let mut registry = Registry::new();
        registry.register_family(family("shrub")).unwrap();
        let cluster = LeafCluster::new(IVec3::new(3, 1, 3), IVec3::new(1, 0, 1), vec![1; 9]).unwrap();
        let kit = CellKit::new("shrub", CellSolver::new(vec![0x0512, 0x0211]), 2, cluster).unwrap();
        registry.register_cell_kit(kit.clone()).unwrap();
        assert!(registry.register_cell_kit(kit).is_err());

        let id = registry.register_leaves(leaves("shrub", "shrub", "shrub")).unwrap();
        let props = registry.leaves(id).unwrap();
        assert_eq!(props.cell_kit().default_hydration(), 2);
        assert_eq!(registry.leaves_for_family(props.family().id).unwrap().id(), id);
    }
}

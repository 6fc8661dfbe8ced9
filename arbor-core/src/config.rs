//! Already-parsed configuration for families, leaves and species.
//!
//! Every `*Def` derives [`Deserialize`] with field defaults so an outer
//! loader can hand over whatever subset it read. Names are resolved to ids
//! by [`crate::species::Registry`].

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyDef {
    pub name: String,
    /// Radius of a twig. Twigs are the only branches that bear leaves.
    pub primary_thickness: u8,
    /// Radius reported back to a parent after a successful branch-out.
    pub secondary_thickness: u8,
    pub max_branch_radius: u8,
}

impl Default for FamilyDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            primary_thickness: 1,
            secondary_thickness: 2,
            max_branch_radius: 8,
        }
    }
}

/// Light and smother limits used by leaf aging.
///
/// `hysteresis` is subtracted from `requirement` when leaves already exist at
/// the position, so established foliage survives a little more shade than new
/// foliage needs. Some species historically used 0 here; keep it configurable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightThresholds {
    pub requirement: u8,
    pub hysteresis: u8,
    /// Number of tree parts stacked above a bottom leaf that smother it. 0 disables.
    pub smother_max: u8,
}

impl Default for LightThresholds {
    fn default() -> Self {
        Self {
            requirement: 13,
            hysteresis: 2,
            smother_max: 4,
        }
    }
}

impl LightThresholds {
    /// Minimum sky light for a position, depending on whether leaves already sit there.
    pub fn minimum(&self, existing_leaves: bool) -> u8 {
        if existing_leaves {
            self.requirement.saturating_sub(self.hysteresis)
        } else {
            self.requirement
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeavesDef {
    pub name: String,
    pub family: String,
    pub cell_kit: String,
    pub light: LightThresholds,
}

impl Default for LeavesDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            family: String::new(),
            cell_kit: "deciduous".to_string(),
            light: LightThresholds::default(),
        }
    }
}

/// Numeric growth parameters of one species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesConfig {
    /// Energy handed to the growth logic's energy function for each pulse.
    pub signal_energy: f32,
    /// Base weight for growing up.
    pub up_probability: f32,
    /// Extra weight for continuing in the current travel direction.
    pub reinf_travel: f32,
    /// Steps from the root during which the trunk may only grow up.
    pub lowest_branch_height: u32,
    /// Added to the area-derived radius of every thickened node.
    pub tapering: f32,
    /// Energy spent per step.
    pub step_cost: f32,
    /// Extra energy spent for a step taken upward.
    pub climb_cost: f32,
    /// Remaining energy is divided by this when the signal turns out of the trunk.
    pub trunk_exit_divisor: f32,
    /// Hard bound on steps per pulse, and on the depth of the walk that
    /// collects a piece cut from a tree of this species.
    pub max_signal_depth: u32,
}

impl Default for SpeciesConfig {
    fn default() -> Self {
        Self {
            signal_energy: 16.0,
            up_probability: 2.0,
            reinf_travel: 1.0,
            lowest_branch_height: 4,
            tapering: 0.3,
            step_cost: 1.0,
            climb_cost: 0.0,
            trunk_exit_divisor: 1.5,
            max_signal_depth: 32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesDef {
    pub name: String,
    pub family: String,
    pub leaves: String,
    pub growth_logic: String,
    pub config: SpeciesConfig,
}

impl Default for SpeciesDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            family: String::new(),
            leaves: String::new(),
            growth_logic: "default".to_string(),
            config: SpeciesConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_def_fills_missing_fields_with_defaults() {
        let def: SpeciesDef = serde_json::from_str(
            r#"{ "name": "spruce", "family": "spruce", "leaves": "spruce",
                 "growth_logic": "conifer", "config": { "signal_energy": 10.0 } }"#,
        )
        .unwrap();

        assert_eq!(def.growth_logic, "conifer");
        assert_eq!(def.config.signal_energy, 10.0);
        assert_eq!(def.config.lowest_branch_height, 4);
        assert_eq!(def.config.max_signal_depth, 32);
    }

    #[test]
    fn leaves_def_defaults_to_deciduous_kit() {
        let def: LeavesDef = serde_json::from_str(r#"{ "name": "oak", "family": "oak" }"#).unwrap();
        assert_eq!(def.cell_kit, "deciduous");
        assert_eq!(def.light, LightThresholds::default());
    }

    #[test]
    fn light_minimum_applies_hysteresis_only_to_existing_leaves() {
        let light = LightThresholds {
            requirement: 13,
            hysteresis: 2,
            smother_max: 4,
        };
        assert_eq!(light.minimum(false), 13);
        assert_eq!(light.minimum(true), 11);

        let strict = LightThresholds {
            hysteresis: 0,
            ..light
        };
        assert_eq!(strict.minimum(true), 13);
    }
}

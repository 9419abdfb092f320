//! Per-generation statistical profiles.
//!
//! Each governance generation is calibrated by the mean and standard
//! deviation of four metrics. The catalog always holds exactly one profile
//! per generation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Governance architecture generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Generation {
    /// Token-vote DAO
    #[serde(rename = "DAO 1.0")]
    Dao1,

    /// Delegated / modular DAO
    #[serde(rename = "DAO 2.0")]
    Dao2,

    /// Compliance-aware DAO
    #[serde(rename = "DAO 3.0")]
    Dao3,
}

impl Generation {
    /// All generations in their fixed cyclic order.
    pub const ALL: [Generation; 3] = [Generation::Dao1, Generation::Dao2, Generation::Dao3];

    /// Numeric id recorded on-chain as `daoVersion`.
    pub fn id(&self) -> u8 {
        match self {
            Generation::Dao1 => 1,
            Generation::Dao2 => 2,
            Generation::Dao3 => 3,
        }
    }

    /// Looks up a generation by its on-chain id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.id() == id)
    }

    /// Returns the table label.
    pub fn label(&self) -> &'static str {
        match self {
            Generation::Dao1 => "DAO 1.0",
            Generation::Dao2 => "DAO 2.0",
            Generation::Dao3 => "DAO 3.0",
        }
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(' ', "").as_str() {
            "dao1.0" | "dao1" | "gen1" | "1" => Ok(Generation::Dao1),
            "dao2.0" | "dao2" | "gen2" | "2" => Ok(Generation::Dao2),
            "dao3.0" | "dao3" | "gen3" | "3" => Ok(Generation::Dao3),
            _ => Err(format!("Unknown generation: {}", s)),
        }
    }
}

/// Errors raised while loading a profile catalog.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Expected exactly 3 profiles, got {0}")]
    WrongCount(usize),

    #[error("Duplicate profile for {0}")]
    Duplicate(Generation),

    #[error("Invalid {field} for {generation}: {value}")]
    InvalidParameter {
        generation: Generation,
        field: &'static str,
        value: f64,
    },

    #[error("Failed to parse profiles: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read profiles: {0}")]
    Io(#[from] std::io::Error),
}

/// Statistical calibration of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoProfile {
    pub generation: Generation,

    /// Decision latency in seconds
    pub latency_mean: f64,
    pub latency_std: f64,

    /// Compliance score in percent
    pub compliance_mean: f64,
    pub compliance_std: f64,

    /// Total operating cost per decision
    pub total_cost_mean: f64,
    pub total_cost_std: f64,

    /// Return on investment in percent
    pub roi_mean: f64,
    pub roi_std: f64,
}

impl DaoProfile {
    /// Returns the on-chain generation id.
    pub fn generation_id(&self) -> u8 {
        self.generation.id()
    }

    /// Total cost is truncated to mean ± 3σ of its own profile.
    pub fn total_cost_bounds(&self) -> (f64, f64) {
        let spread = 3.0 * self.total_cost_std;
        (self.total_cost_mean - spread, self.total_cost_mean + spread)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        let means = [
            ("latency_mean", self.latency_mean),
            ("compliance_mean", self.compliance_mean),
            ("total_cost_mean", self.total_cost_mean),
            ("roi_mean", self.roi_mean),
        ];
        let stds = [
            ("latency_std", self.latency_std),
            ("compliance_std", self.compliance_std),
            ("total_cost_std", self.total_cost_std),
            ("roi_std", self.roi_std),
        ];

        for (field, value) in means {
            if !value.is_finite() {
                return Err(self.invalid(field, value));
            }
        }
        for (field, value) in stds {
            if !value.is_finite() || value < 0.0 {
                return Err(self.invalid(field, value));
            }
        }
        Ok(())
    }

    fn invalid(&self, field: &'static str, value: f64) -> ProfileError {
        ProfileError::InvalidParameter {
            generation: self.generation,
            field,
            value,
        }
    }
}

/// The three generation profiles, indexed by generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCatalog {
    profiles: [DaoProfile; 3],
}

impl ProfileCatalog {
    /// Built-in calibration.
    pub fn standard() -> Self {
        Self {
            profiles: [
                DaoProfile {
                    generation: Generation::Dao1,
                    latency_mean: 15.8,
                    latency_std: 1.0,
                    compliance_mean: 71.0,
                    compliance_std: 3.0,
                    total_cost_mean: 119_000.0,
                    total_cost_std: 5_600.0,
                    roi_mean: 1.02,
                    roi_std: 0.5,
                },
                DaoProfile {
                    generation: Generation::Dao2,
                    latency_mean: 9.4,
                    latency_std: 1.0,
                    compliance_mean: 83.0,
                    compliance_std: 3.0,
                    total_cost_mean: 90_000.0,
                    total_cost_std: 4_500.0,
                    roi_mean: 4.0,
                    roi_std: 0.5,
                },
                DaoProfile {
                    generation: Generation::Dao3,
                    latency_mean: 4.2,
                    latency_std: 1.1,
                    compliance_mean: 97.5,
                    compliance_std: 2.4,
                    total_cost_mean: 55_000.0,
                    total_cost_std: 2_600.0,
                    roi_mean: 7.5,
                    roi_std: 0.5,
                },
            ],
        }
    }

    /// Builds a catalog, requiring exactly one valid profile per generation.
    pub fn from_profiles(profiles: Vec<DaoProfile>) -> Result<Self, ProfileError> {
        if profiles.len() != 3 {
            return Err(ProfileError::WrongCount(profiles.len()));
        }

        let mut slots: [Option<DaoProfile>; 3] = [None, None, None];
        for profile in profiles {
            profile.validate()?;
            let slot = &mut slots[(profile.generation_id() - 1) as usize];
            if slot.is_some() {
                return Err(ProfileError::Duplicate(profile.generation));
            }
            *slot = Some(profile);
        }

        // Three distinct generations out of three means every slot is filled
        let [Some(p1), Some(p2), Some(p3)] = slots else {
            return Err(ProfileError::WrongCount(3));
        };
        Ok(Self {
            profiles: [p1, p2, p3],
        })
    }

    /// Parses a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let profiles: Vec<DaoProfile> = serde_json::from_str(json)?;
        Self::from_profiles(profiles)
    }

    /// Loads a JSON profile file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns the profile of a generation.
    pub fn get(&self, generation: Generation) -> &DaoProfile {
        &self.profiles[(generation.id() - 1) as usize]
    }

    /// Iterates profiles in generation order.
    pub fn iter(&self) -> impl Iterator<Item = &DaoProfile> {
        self.profiles.iter()
    }

    /// Serializes the catalog as a JSON array.
    pub fn to_json(&self) -> Result<String, ProfileError> {
        Ok(serde_json::to_string_pretty(&self.profiles)?)
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

//! Optimization method configuration.
//!
//! [`OptimizationConfig`] is what a run receives: the iteration budget plus
//! the settings of exactly one method. [`ConfigModel`] is the editable side;
//! it keeps the settings of every method so switching back and forth never
//! loses what was entered.

use gb_types::{config_error, GbResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::ConfigFieldError;

pub const DEFAULT_ITERATIONS: u32 = 100;
pub const DEFAULT_POPULATION_SIZE: u32 = 50;
pub const DEFAULT_MUTATION_RATE: f64 = 0.1;
pub const DEFAULT_CROSSOVER_RATE: f64 = 0.8;
pub const DEFAULT_PARTICLE_INERTIA: f64 = 0.7;
pub const DEFAULT_PARTICLE_ACCELERATION: f64 = 1.5;
pub const DEFAULT_EXPLORATION_RATE: f64 = 0.1;

pub const MIN_ITERATIONS: u32 = 1;
pub const MIN_POPULATION_SIZE: u32 = 10;

/// Search heuristic requested from the external backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    Grid,
    Random,
    Bayesian,
    Evolutionary,
    ParticleSwarm,
}

impl OptimizationMethod {
    pub const ALL: [OptimizationMethod; 5] = [
        Self::Grid,
        Self::Random,
        Self::Bayesian,
        Self::Evolutionary,
        Self::ParticleSwarm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Random => "random",
            Self::Bayesian => "bayesian",
            Self::Evolutionary => "evolutionary",
            Self::ParticleSwarm => "particle_swarm",
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationMethod {
    type Err = ConfigFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ConfigFieldError::UnknownMethod(s.to_string()))
    }
}

/// Bayesian optimization settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BayesianSettings {
    pub exploration_rate: f64,
}

/// Evolutionary algorithm settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionarySettings {
    pub population_size: u32,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
}

/// Particle swarm settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleSwarmSettings {
    pub population_size: u32,
    pub particle_inertia: f64,
    pub particle_acceleration: f64,
}

/// Method-specific settings, tagged by `method` when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MethodSettings {
    Grid,
    Random,
    Bayesian(BayesianSettings),
    Evolutionary(EvolutionarySettings),
    ParticleSwarm(ParticleSwarmSettings),
}

impl MethodSettings {
    pub fn method(&self) -> OptimizationMethod {
        match self {
            Self::Grid => OptimizationMethod::Grid,
            Self::Random => OptimizationMethod::Random,
            Self::Bayesian(_) => OptimizationMethod::Bayesian,
            Self::Evolutionary(_) => OptimizationMethod::Evolutionary,
            Self::ParticleSwarm(_) => OptimizationMethod::ParticleSwarm,
        }
    }
}

/// Configuration handed to a single optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationConfig {
    pub iterations: u32,
    #[serde(flatten)]
    pub settings: MethodSettings,
}

impl OptimizationConfig {
    pub fn new(iterations: u32, settings: MethodSettings) -> Self {
        Self {
            iterations,
            settings,
        }
    }

    pub fn method(&self) -> OptimizationMethod {
        self.settings.method()
    }

    /// Every numeric field that is meaningful for the active method.
    pub fn field_values(&self) -> Vec<(ConfigField, f64)> {
        let mut values = vec![(ConfigField::Iterations, f64::from(self.iterations))];
        match self.settings {
            MethodSettings::Grid | MethodSettings::Random => {}
            MethodSettings::Bayesian(s) => {
                values.push((ConfigField::ExplorationRate, s.exploration_rate));
            }
            MethodSettings::Evolutionary(s) => {
                values.push((ConfigField::PopulationSize, f64::from(s.population_size)));
                values.push((ConfigField::MutationRate, s.mutation_rate));
                values.push((ConfigField::CrossoverRate, s.crossover_rate));
            }
            MethodSettings::ParticleSwarm(s) => {
                values.push((ConfigField::PopulationSize, f64::from(s.population_size)));
                values.push((ConfigField::ParticleInertia, s.particle_inertia));
                values.push((ConfigField::ParticleAcceleration, s.particle_acceleration));
            }
        }
        values
    }

    /// Check every field against its bounds.
    pub fn validate(&self) -> Result<(), ConfigFieldError> {
        self.field_values()
            .into_iter()
            .try_for_each(|(field, value)| field.check(value).map(|_| ()))
    }

    pub fn from_json(json: &str) -> GbResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config
            .validate()
            .map_err(|e| config_error!("invalid optimization config: {}", e))?;
        Ok(config)
    }

    pub fn to_json(&self) -> GbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        ConfigModel::default().config()
    }
}

/// A numeric configuration field that can be edited by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigField {
    Iterations,
    PopulationSize,
    MutationRate,
    CrossoverRate,
    ParticleInertia,
    ParticleAcceleration,
    ExplorationRate,
}

impl ConfigField {
    pub const ALL: [ConfigField; 7] = [
        Self::Iterations,
        Self::PopulationSize,
        Self::MutationRate,
        Self::CrossoverRate,
        Self::ParticleInertia,
        Self::ParticleAcceleration,
        Self::ExplorationRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iterations => "iterations",
            Self::PopulationSize => "populationSize",
            Self::MutationRate => "mutationRate",
            Self::CrossoverRate => "crossoverRate",
            Self::ParticleInertia => "particleInertia",
            Self::ParticleAcceleration => "particleAcceleration",
            Self::ExplorationRate => "explorationRate",
        }
    }

    fn snake_case(&self) -> &'static str {
        match self {
            Self::Iterations => "iterations",
            Self::PopulationSize => "population_size",
            Self::MutationRate => "mutation_rate",
            Self::CrossoverRate => "crossover_rate",
            Self::ParticleInertia => "particle_inertia",
            Self::ParticleAcceleration => "particle_acceleration",
            Self::ExplorationRate => "exploration_rate",
        }
    }

    /// Whether the field has any effect under `method`.
    pub fn applies_to(&self, method: OptimizationMethod) -> bool {
        use OptimizationMethod::*;
        match self {
            Self::Iterations => true,
            Self::PopulationSize => matches!(method, Evolutionary | ParticleSwarm),
            Self::MutationRate | Self::CrossoverRate => method == Evolutionary,
            Self::ParticleInertia | Self::ParticleAcceleration => method == ParticleSwarm,
            Self::ExplorationRate => method == Bayesian,
        }
    }

    fn is_integer(&self) -> bool {
        matches!(self, Self::Iterations | Self::PopulationSize)
    }

    fn bounds(&self) -> (f64, f64, &'static str) {
        match self {
            Self::Iterations => (f64::from(MIN_ITERATIONS), f64::from(u32::MAX), ">= 1"),
            Self::PopulationSize => (f64::from(MIN_POPULATION_SIZE), f64::from(u32::MAX), ">= 10"),
            Self::MutationRate
            | Self::CrossoverRate
            | Self::ParticleInertia
            | Self::ExplorationRate => (0.0, 1.0, "[0, 1]"),
            Self::ParticleAcceleration => (0.0, f64::MAX, ">= 0"),
        }
    }

    /// Validate a candidate value, returning it unchanged when accepted.
    pub fn check(&self, value: f64) -> Result<f64, ConfigFieldError> {
        let (low, high, expected) = self.bounds();
        if !value.is_finite() || value < low || value > high {
            return Err(ConfigFieldError::OutOfRange {
                field: *self,
                value,
                expected,
            });
        }
        if self.is_integer() && value.fract() != 0.0 {
            return Err(ConfigFieldError::NotAnInteger { field: *self, value });
        }
        Ok(value)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigField {
    type Err = ConfigFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s || field.snake_case() == s)
            .ok_or_else(|| ConfigFieldError::UnknownField(s.to_string()))
    }
}

/// Editable optimization configuration.
///
/// Holds the settings of every method at once; [`ConfigModel::config`]
/// projects them onto the active method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigModel {
    method: OptimizationMethod,
    iterations: u32,
    /// Shared by the evolutionary and particle-swarm methods.
    population_size: u32,
    mutation_rate: f64,
    crossover_rate: f64,
    particle_inertia: f64,
    particle_acceleration: f64,
    exploration_rate: f64,
}

impl Default for ConfigModel {
    fn default() -> Self {
        Self {
            method: OptimizationMethod::Evolutionary,
            iterations: DEFAULT_ITERATIONS,
            population_size: DEFAULT_POPULATION_SIZE,
            mutation_rate: DEFAULT_MUTATION_RATE,
            crossover_rate: DEFAULT_CROSSOVER_RATE,
            particle_inertia: DEFAULT_PARTICLE_INERTIA,
            particle_acceleration: DEFAULT_PARTICLE_ACCELERATION,
            exploration_rate: DEFAULT_EXPLORATION_RATE,
        }
    }
}

impl ConfigModel {
    /// Seed a model from an existing config. Fields the config does not carry
    /// keep their defaults.
    pub fn from_config(config: OptimizationConfig) -> Result<Self, ConfigFieldError> {
        config.validate()?;
        let mut model = Self {
            method: config.method(),
            ..Self::default()
        };
        for (field, value) in config.field_values() {
            model.store(field, value);
        }
        Ok(model)
    }

    pub fn method(&self) -> OptimizationMethod {
        self.method
    }

    /// Switch the active method. Stored settings of every method are kept.
    pub fn set_method(&mut self, method: OptimizationMethod) {
        self.method = method;
    }

    /// Fields that affect the active method, with their current values.
    pub fn active_fields(&self) -> Vec<(ConfigField, f64)> {
        ConfigField::ALL
            .into_iter()
            .filter(|field| field.applies_to(self.method))
            .map(|field| (field, self.field(field)))
            .collect()
    }

    pub fn field(&self, field: ConfigField) -> f64 {
        match field {
            ConfigField::Iterations => f64::from(self.iterations),
            ConfigField::PopulationSize => f64::from(self.population_size),
            ConfigField::MutationRate => self.mutation_rate,
            ConfigField::CrossoverRate => self.crossover_rate,
            ConfigField::ParticleInertia => self.particle_inertia,
            ConfigField::ParticleAcceleration => self.particle_acceleration,
            ConfigField::ExplorationRate => self.exploration_rate,
        }
    }

    /// Assign a field after bounds checking. A rejected value leaves the
    /// model unchanged.
    pub fn set_field(&mut self, field: ConfigField, value: f64) -> Result<(), ConfigFieldError> {
        match field.check(value) {
            Ok(value) => {
                self.store(field, value);
                Ok(())
            }
            Err(e) => {
                warn!(field = %field, value, error = %e, "rejected configuration edit");
                Err(e)
            }
        }
    }

    /// Like [`ConfigModel::set_field`], with the field given by key
    /// (`populationSize` or `population_size`).
    pub fn set_field_by_key(&mut self, key: &str, value: f64) -> Result<(), ConfigFieldError> {
        let field = key.parse::<ConfigField>()?;
        self.set_field(field, value)
    }

    /// Snapshot of the configuration for the active method.
    pub fn config(&self) -> OptimizationConfig {
        let settings = match self.method {
            OptimizationMethod::Grid => MethodSettings::Grid,
            OptimizationMethod::Random => MethodSettings::Random,
            OptimizationMethod::Bayesian => MethodSettings::Bayesian(BayesianSettings {
                exploration_rate: self.exploration_rate,
            }),
            OptimizationMethod::Evolutionary => MethodSettings::Evolutionary(EvolutionarySettings {
                population_size: self.population_size,
                mutation_rate: self.mutation_rate,
                crossover_rate: self.crossover_rate,
            }),
            OptimizationMethod::ParticleSwarm => {
                MethodSettings::ParticleSwarm(ParticleSwarmSettings {
                    population_size: self.population_size,
                    particle_inertia: self.particle_inertia,
                    particle_acceleration: self.particle_acceleration,
                })
            }
        };
        OptimizationConfig::new(self.iterations, settings)
    }

    // Callers have already checked `value`.
    fn store(&mut self, field: ConfigField, value: f64) {
        match field {
            ConfigField::Iterations => self.iterations = value as u32,
            ConfigField::PopulationSize => self.population_size = value as u32,
            ConfigField::MutationRate => self.mutation_rate = value,
            ConfigField::CrossoverRate => self.crossover_rate = value,
            ConfigField::ParticleInertia => self.particle_inertia = value,
            ConfigField::ParticleAcceleration => self.particle_acceleration = value,
            ConfigField::ExplorationRate => self.exploration_rate = value,
        }
    }
}

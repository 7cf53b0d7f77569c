//! Workout and nutrition plan catalog.
//!
//! The catalog is a static YAML document:
//!
//! ```yaml
//! workouts:
//!   running:
//!     1: ["Jog 10min", "Walk 5min"]
//! nutrition:
//!   vegan:
//!     1: ["Tofu bowl", "Lentil soup"]
//! motivational_messages:
//!   - "One more rep!"
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{FitbotError, Result};

/// Cooldown exercises; one is appended to every workout.
const COOLDOWNS: [&str; 3] = ["Deep Breathing 2min", "Hydration Break", "Static Stretching 5min"];

/// Used when the catalog has no motivational messages.
const FALLBACK_MOTIVATION: &str = "💪 Keep going, every session counts!";

/// Sports a workout can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    General,
    Yoga,
    Running,
    Weightlifting,
    Swimming,
}

impl Sport {
    pub const ALL: [Sport; 5] = [
        Sport::General,
        Sport::Yoga,
        Sport::Running,
        Sport::Weightlifting,
        Sport::Swimming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::General => "general",
            Sport::Yoga => "yoga",
            Sport::Running => "running",
            Sport::Weightlifting => "weightlifting",
            Sport::Swimming => "swimming",
        }
    }
}

impl FromStr for Sport {
    type Err = FitbotError;

    fn from_str(s: &str) -> Result<Self> {
        Sport::ALL
            .into_iter()
            .find(|sport| sport.as_str() == s)
            .ok_or_else(|| {
                FitbotError::InvalidRequest(format!(
                    "Invalid sport. Allowed: {}",
                    join_names(Sport::ALL.iter().map(Sport::as_str))
                ))
            })
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nutrition goals a meal plan can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Balance,
    WeightLoss,
    MuscleGain,
    Vegan,
}

impl Goal {
    pub const ALL: [Goal; 4] = [Goal::Balance, Goal::WeightLoss, Goal::MuscleGain, Goal::Vegan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Balance => "balance",
            Goal::WeightLoss => "weight_loss",
            Goal::MuscleGain => "muscle_gain",
            Goal::Vegan => "vegan",
        }
    }
}

impl FromStr for Goal {
    type Err = FitbotError;

    fn from_str(s: &str) -> Result<Self> {
        Goal::ALL
            .into_iter()
            .find(|goal| goal.as_str() == s)
            .ok_or_else(|| {
                FitbotError::InvalidRequest(format!(
                    "Invalid goal. Allowed: {}",
                    join_names(Goal::ALL.iter().map(Goal::as_str))
                ))
            })
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// A user's fitness level, between 1 and 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FitnessLevel(u8);

impl FitnessLevel {
    pub const MIN: FitnessLevel = FitnessLevel(1);
    pub const MAX: FitnessLevel = FitnessLevel(3);

    pub fn new(level: u8) -> Result<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(FitbotError::InvalidRequest(
                "Fitness level must be between 1 and 3".to_string(),
            ))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for FitnessLevel {
    fn default() -> Self {
        Self::MIN
    }
}

/// A generated plan: the lines to send, followed by a motivational message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub lines: Vec<String>,
    pub motivation: String,
}

impl Plan {
    /// Reply messages for this plan: the plan itself, then the motivation.
    pub fn into_replies(self) -> Vec<String> {
        vec![self.lines.join("\n"), self.motivation]
    }
}

/// Static workout and nutrition content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Exercises per sport and fitness level
    #[serde(default)]
    pub workouts: HashMap<Sport, BTreeMap<u8, Vec<String>>>,
    /// Meals per goal and fitness level
    #[serde(default)]
    pub nutrition: HashMap<Goal, BTreeMap<u8, Vec<String>>>,
    /// Messages appended to every plan
    #[serde(default)]
    pub motivational_messages: Vec<String>,
}

impl Catalog {
    /// Load the catalog from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading plan catalog");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load the catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| FitbotError::Config(format!("Failed to parse plan catalog: {}", e)))
    }

    /// Build a workout: the level's exercises plus one random cooldown.
    pub fn workout<R: Rng + ?Sized>(&self, level: FitnessLevel, sport: Sport, rng: &mut R) -> Plan {
        let mut lines = self
            .workouts
            .get(&sport)
            .and_then(|levels| levels.get(&level.get()))
            .cloned()
            .unwrap_or_default();

        if let Some(cooldown) = COOLDOWNS.choose(rng) {
            lines.push(cooldown.to_string());
        }

        Plan {
            lines,
            motivation: self.motivation(rng),
        }
    }

    /// Build a meal plan with an estimated calorie count per meal.
    pub fn nutrition<R: Rng + ?Sized>(&self, goal: Goal, level: FitnessLevel, rng: &mut R) -> Plan {
        let lines = self
            .nutrition
            .get(&goal)
            .and_then(|levels| levels.get(&level.get()))
            .map(|meals| {
                meals
                    .iter()
                    .map(|meal| format!("🍽 {} ({}kcal)", meal, rng.gen_range(300..=600)))
                    .collect()
            })
            .unwrap_or_default();

        Plan {
            lines,
            motivation: self.motivation(rng),
        }
    }

    fn motivation<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let messages: Vec<&String> = self
            .motivational_messages
            .iter()
            .filter(|m| !m.trim().is_empty())
            .collect();

        messages
            .choose(rng)
            .map(|m| m.to_string())
            .unwrap_or_else(|| FALLBACK_MOTIVATION.to_string())
    }
}

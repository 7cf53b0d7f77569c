//! User profile storage.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use super::catalog::FitnessLevel;
use crate::error::{FitbotError, Result};

/// Persistent user state used by the command handlers.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fitness level of a known user, or `None` for an unknown user.
    async fn fitness_level(&self, user_id: i64) -> Result<Option<FitnessLevel>>;

    /// Register a user at the default fitness level.
    async fn create_user(&self, user_id: i64) -> Result<FitnessLevel>;

    /// Append a workout to the user's history.
    async fn record_workout(&self, user_id: i64, workout: &str) -> Result<()>;
}

/// Workouts kept per user; older entries are dropped first.
pub const MAX_WORKOUT_HISTORY: usize = 100;

#[derive(Debug, Default)]
struct UserProfile {
    fitness_level: FitnessLevel,
    workouts: VecDeque<String>,
}

/// In-process profile store.
///
/// Profiles live for the life of the process. Each user's history is capped
/// at [`MAX_WORKOUT_HISTORY`] entries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's fitness level, creating the user if needed.
    pub fn set_fitness_level(&self, user_id: i64, level: FitnessLevel) {
        self.users.write().entry(user_id).or_default().fitness_level = level;
    }

    /// Recorded workouts for a user, oldest first.
    pub fn workout_history(&self, user_id: i64) -> Vec<String> {
        self.users
            .read()
            .get(&user_id)
            .map(|user| user.workouts.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn fitness_level(&self, user_id: i64) -> Result<Option<FitnessLevel>> {
        Ok(self.users.read().get(&user_id).map(|user| user.fitness_level))
    }

    async fn create_user(&self, user_id: i64) -> Result<FitnessLevel> {
        let mut users = self.users.write();
        let user = users.entry(user_id).or_insert_with(|| {
            debug!(user_id, "Creating user profile");
            UserProfile::default()
        });
        Ok(user.fitness_level)
    }

    async fn record_workout(&self, user_id: i64, workout: &str) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| FitbotError::Store(format!("unknown user {}", user_id)))?;
        if user.workouts.len() == MAX_WORKOUT_HISTORY {
            user.workouts.pop_front();
        }
        user.workouts.push_back(workout.to_string());
        Ok(())
    }
}

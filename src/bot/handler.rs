//! Command dispatch.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::catalog::{Catalog, Goal, Plan, Sport};
use super::command::Command;
use super::store::ProfileStore;
use crate::error::{FitbotError, Result};
use crate::ratelimit::{LimitKey, RateLimiterBackend};

pub const WELCOME: &str = "🏋️ Welcome to FitnessBot!\n\n\
    Available commands:\n\
    /workout [sport] - Get personalized workout\n\
    /nutrition [goal] - Get meal plan";

pub const HELP: &str = "ℹ️ Use commands to interact with me:\n\
    /workout - Get exercises\n\
    /nutrition - Get meal plan";

pub const RATE_LIMITED: &str = "⚠️ Rate limit exceeded. Try again in 1 minute.";

const WORKOUT_FAILED: &str = "⚠️ Failed to generate workout. Try again later.";
const NUTRITION_FAILED: &str = "⚠️ Failed to generate nutrition plan";

/// Routes incoming messages to command handlers.
///
/// Rate-limited commands consult the limiter before doing anything else; a
/// denied request gets [`RATE_LIMITED`] and touches no other state.
pub struct Dispatcher<R: RateLimiterBackend, S: ProfileStore> {
    /// The rate limiter instance
    limiter: Arc<R>,
    /// User profiles
    store: Arc<S>,
    /// Static plan content
    catalog: Arc<Catalog>,
}

impl<R: RateLimiterBackend, S: ProfileStore> Dispatcher<R, S> {
    pub fn new(limiter: Arc<R>, store: Arc<S>, catalog: Arc<Catalog>) -> Self {
        Self {
            limiter,
            store,
            catalog,
        }
    }

    /// Handle one message from `user_id`, returning the reply messages.
    #[instrument(skip(self, text))]
    pub async fn handle(&self, user_id: i64, text: &str) -> Vec<String> {
        let command = Command::parse(text);
        debug!(command = ?command, "Dispatching message");

        if command.is_rate_limited() && !self.limiter.consume(LimitKey::user(user_id).as_str()) {
            info!(user_id, "Request rejected by rate limiter");
            return vec![RATE_LIMITED.to_string()];
        }

        match command {
            Command::Start => vec![WELCOME.to_string()],
            Command::Workout { sport } => {
                reply_with(self.workout(user_id, &sport).await, WORKOUT_FAILED, "Workout error")
            }
            Command::Nutrition { goal } => reply_with(
                self.nutrition(user_id, &goal).await,
                NUTRITION_FAILED,
                "Nutrition error",
            ),
            Command::Text => vec![HELP.to_string()],
        }
    }

    async fn workout(&self, user_id: i64, sport: &str) -> Result<Plan> {
        let sport: Sport = sport.parse()?;

        let level = match self.store.fitness_level(user_id).await? {
            Some(level) => level,
            None => self.store.create_user(user_id).await?,
        };

        let plan = self.catalog.workout(level, sport, &mut rand::thread_rng());
        self.store
            .record_workout(user_id, &plan.lines.join(", "))
            .await?;

        info!(user_id, sport = %sport, level = level.get(), "Workout generated");
        Ok(plan)
    }

    async fn nutrition(&self, user_id: i64, goal: &str) -> Result<Plan> {
        let goal: Goal = goal.parse()?;
        let level = self.store.fitness_level(user_id).await?.unwrap_or_default();

        let plan = self.catalog.nutrition(goal, level, &mut rand::thread_rng());
        info!(user_id, goal = %goal, level = level.get(), "Nutrition plan generated");
        Ok(plan)
    }
}

/// Turn a handler result into replies. Invalid input is shown to the user;
/// anything else is logged and answered with `failure`.
fn reply_with(result: Result<Plan>, failure: &str, context: &str) -> Vec<String> {
    match result {
        Ok(plan) => plan.into_replies(),
        Err(FitbotError::InvalidRequest(message)) => vec![format!("❌ Error: {}", message)],
        Err(e) => {
            error!(error = %e, "{}", context);
            vec![failure.to_string()]
        }
    }
}

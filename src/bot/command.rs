//! Chat command parsing.

/// Sport used when `/workout` has no arguments.
pub const DEFAULT_SPORT: &str = "general";
/// Goal used when `/nutrition` has no arguments.
pub const DEFAULT_GOAL: &str = "balance";

/// A parsed incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/workout [sport]`
    Workout { sport: String },
    /// `/nutrition [goal]`
    Nutrition { goal: String },
    /// Anything else, including unknown commands
    Text,
}

impl Command {
    /// Parse message text.
    ///
    /// Arguments are joined with single spaces and lowercased. A trailing
    /// bot mention on the command (`/workout@fitbot`) is ignored.
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let Some(first) = words.next() else {
            return Command::Text;
        };
        let Some(name) = first.strip_prefix('/') else {
            return Command::Text;
        };
        let name = name.split('@').next().unwrap_or_default();
        let args = || {
            let joined = words.clone().collect::<Vec<_>>().join(" ").to_lowercase();
            (!joined.is_empty()).then_some(joined)
        };

        match name {
            "start" => Command::Start,
            "workout" => Command::Workout {
                sport: args().unwrap_or_else(|| DEFAULT_SPORT.to_string()),
            },
            "nutrition" => Command::Nutrition {
                goal: args().unwrap_or_else(|| DEFAULT_GOAL.to_string()),
            },
            _ => Command::Text,
        }
    }

    /// Whether the command is subject to per-user rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Command::Workout { .. })
    }
}

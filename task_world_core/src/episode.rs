use serde::Serialize;
use tracing::{debug, info};

use crate::{agent::Agent, world::WorldState};

/// Outcome of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpisodeReport {
    /// Sum of action rewards plus the per-tick carrying reward.
    pub total_return: f64,
    pub steps: usize,
    pub goal_reached: bool,
}

/// Aggregate over many episodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub episodes: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub successes: usize,
}

impl ExperimentSummary {
    pub fn success_rate(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.successes as f64 / self.episodes as f64
        }
    }
}

/// Runs `agent` in `world` until the goal is reached or `max_steps` actions
/// have been executed. Each tick adds the action reward and the world's
/// carrying reward to the return.
pub fn run_episode(world: &mut WorldState, agent: &mut dyn Agent, max_steps: usize) -> EpisodeReport {
    let mut total_return = 0.0;
    let mut steps = 0;
    while steps < max_steps && !world.is_goal_reached() {
        let action = agent.choose_action(world);
        let outcome = world.execute(action);
        total_return += outcome.reward + world.carrying_reward();
        steps += 1;
        debug!(step = steps, ?action, success = outcome.success, reward = outcome.reward, "tick");
    }
    let report = EpisodeReport {
        total_return,
        steps,
        goal_reached: world.is_goal_reached(),
    };
    info!(
        agent = agent.name(),
        steps = report.steps,
        goal_reached = report.goal_reached,
        total_return = report.total_return,
        "episode finished"
    );
    report
}

/// Runs `episodes` independent episodes, each on a fresh world and agent
/// built from the episode index.
pub fn run_experiment<W, A>(
    episodes: usize,
    max_steps: usize,
    mut make_world: W,
    mut make_agent: A,
) -> ExperimentSummary
where
    W: FnMut(usize) -> WorldState,
    A: FnMut(usize) -> Box<dyn Agent>,
{
    let mut total = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut successes = 0;

    for episode in 0..episodes {
        let mut world = make_world(episode);
        let mut agent = make_agent(episode);
        let report = run_episode(&mut world, agent.as_mut(), max_steps);
        total += report.total_return;
        min = min.min(report.total_return);
        max = max.max(report.total_return);
        if report.goal_reached {
            successes += 1;
        }
    }

    if episodes == 0 {
        return ExperimentSummary {
            episodes,
            average: 0.0,
            min: 0.0,
            max: 0.0,
            successes,
        };
    }
    ExperimentSummary {
        episodes,
        average: total / episodes as f64,
        min,
        max,
        successes,
    }
}

use crate::domain::entities::{Agent, AgentSelection};

/// Default ceiling on concurrently active conversations per agent.
pub const DEFAULT_MAX_CONCURRENT_CHATS: i64 = 3;

/// Picks the least-loaded candidate.
///
/// Candidates keep the order the agent directory returned them in and ties
/// go to the earliest one. Returns `None` when there are no candidates or
/// when even the least-loaded agent is at `max_concurrent_chats`.
pub fn pick_least_loaded<I>(candidates: I, max_concurrent_chats: i64) -> Option<AgentSelection>
where
    I: IntoIterator<Item = (Agent, i64)>,
{
    let mut best: Option<AgentSelection> = None;

    for (agent, active_load) in candidates {
        let is_better = best
            .as_ref()
            .map_or(true, |current| active_load < current.active_load);
        if is_better {
            best = Some(AgentSelection { agent, active_load });
        }
    }

    best.filter(|selection| selection.active_load < max_concurrent_chats)
}

use std::collections::VecDeque;

use serde_json::Value;

use crate::AgentId;

/// Maximum number of entries kept in the rolling status log.
pub const STATUS_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    /// `POST /api/analyze` sent, acknowledgement outstanding.
    Starting,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn in_progress(self) -> bool {
        matches!(self, JobState::Starting | JobState::Running)
    }
}

/// Rolling log of server status lines, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLog {
    entries: VecDeque<String>,
}

impl StatusLog {
    pub fn push(&mut self, line: impl Into<String>) {
        if self.entries.len() == STATUS_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(line.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Final payload of `analysis_complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResults {
    pub final_state: Value,
    pub decision: String,
    pub recommendation: String,
}

// (path into final_state, agent whose output lives there)
const RESULT_FIELDS: [(&[&str], AgentId); 12] = [
    (&["market_report"], AgentId::MarketAnalyst),
    (&["sentiment_report"], AgentId::SocialAnalyst),
    (&["news_report"], AgentId::NewsAnalyst),
    (&["fundamentals_report"], AgentId::FundamentalsAnalyst),
    (&["investment_debate_state", "bull_history"], AgentId::BullResearcher),
    (&["investment_debate_state", "bear_history"], AgentId::BearResearcher),
    (&["investment_plan"], AgentId::ResearchManager),
    (&["trader_investment_plan"], AgentId::Trader),
    (&["risk_debate_state", "risky_history"], AgentId::RiskyAnalyst),
    (&["risk_debate_state", "neutral_history"], AgentId::NeutralAnalyst),
    (&["risk_debate_state", "safe_history"], AgentId::SafeAnalyst),
    (&["final_trade_decision"], AgentId::PortfolioManager),
];

impl FinalResults {
    /// Agents whose output is present (a non-blank string) in the final state.
    pub fn completed_agents(&self) -> Vec<AgentId> {
        RESULT_FIELDS
            .iter()
            .filter(|(path, _)| {
                path.iter()
                    .try_fold(&self.final_state, |value, field| value.get(*field))
                    .and_then(Value::as_str)
                    .is_some_and(|text| !text.trim().is_empty())
            })
            .map(|(_, agent)| *agent)
            .collect()
    }
}

/// Response of `GET /api/final-analysis/{ticker}/{date}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalAnalysis {
    pub final_analysis: String,
    pub recommendation: String,
}

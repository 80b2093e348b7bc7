use std::fmt;

/// One tracked unit of backend work.
///
/// The set is fixed: the server may only report on these entities, and any
/// other name is rejected by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgentId {
    MarketAnalyst,
    SocialAnalyst,
    NewsAnalyst,
    FundamentalsAnalyst,
    BullResearcher,
    BearResearcher,
    ResearchManager,
    Trader,
    RiskyAnalyst,
    NeutralAnalyst,
    SafeAnalyst,
    PortfolioManager,
}

impl AgentId {
    /// Every known agent in pipeline order.
    pub const ALL: [AgentId; 12] = [
        AgentId::MarketAnalyst,
        AgentId::SocialAnalyst,
        AgentId::NewsAnalyst,
        AgentId::FundamentalsAnalyst,
        AgentId::BullResearcher,
        AgentId::BearResearcher,
        AgentId::ResearchManager,
        AgentId::Trader,
        AgentId::RiskyAnalyst,
        AgentId::NeutralAnalyst,
        AgentId::SafeAnalyst,
        AgentId::PortfolioManager,
    ];

    /// Name used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            AgentId::MarketAnalyst => "Market Analyst",
            AgentId::SocialAnalyst => "Social Analyst",
            AgentId::NewsAnalyst => "News Analyst",
            AgentId::FundamentalsAnalyst => "Fundamentals Analyst",
            AgentId::BullResearcher => "Bull Researcher",
            AgentId::BearResearcher => "Bear Researcher",
            AgentId::ResearchManager => "Research Manager",
            AgentId::Trader => "Trader",
            AgentId::RiskyAnalyst => "Risky Analyst",
            AgentId::NeutralAnalyst => "Neutral Analyst",
            AgentId::SafeAnalyst => "Safe Analyst",
            AgentId::PortfolioManager => "Portfolio Manager",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|agent| agent.name() == name)
    }

    /// Report endpoint key holding this agent's output. Several agents share
    /// the `investment` and `final` reports.
    pub fn report_key(self) -> ReportKey {
        match self {
            AgentId::MarketAnalyst => ReportKey::Market,
            AgentId::SocialAnalyst => ReportKey::Sentiment,
            AgentId::NewsAnalyst => ReportKey::News,
            AgentId::FundamentalsAnalyst => ReportKey::Fundamentals,
            AgentId::BullResearcher | AgentId::BearResearcher | AgentId::ResearchManager => {
                ReportKey::Investment
            }
            AgentId::Trader => ReportKey::Trader,
            AgentId::RiskyAnalyst
            | AgentId::NeutralAnalyst
            | AgentId::SafeAnalyst
            | AgentId::PortfolioManager => ReportKey::Final,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AgentStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Error,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::InProgress => "in_progress",
            AgentStatus::Completed => "completed",
            AgentStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(AgentStatus::Pending),
            "in_progress" => Some(AgentStatus::InProgress),
            "completed" => Some(AgentStatus::Completed),
            "error" => Some(AgentStatus::Error),
            _ => None,
        }
    }

    /// Only completed agents have a result worth fetching.
    pub fn is_available(self) -> bool {
        self == AgentStatus::Completed
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a fetchable report, as used in `/api/reports/{ticker}/{date}/{key}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportKey {
    Market,
    Sentiment,
    News,
    Fundamentals,
    Investment,
    Trader,
    Final,
}

impl ReportKey {
    pub const ALL: [ReportKey; 7] = [
        ReportKey::Market,
        ReportKey::Sentiment,
        ReportKey::News,
        ReportKey::Fundamentals,
        ReportKey::Investment,
        ReportKey::Trader,
        ReportKey::Final,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKey::Market => "market",
            ReportKey::Sentiment => "sentiment",
            ReportKey::News => "news",
            ReportKey::Fundamentals => "fundamentals",
            ReportKey::Investment => "investment",
            ReportKey::Trader => "trader",
            ReportKey::Final => "final",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Parsing of the line-oriented user commands read from stdin.

use agentwatch_core::{AgentId, Msg, ReportKey};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  connect | disconnect        open or close the server connection
  ticker <SYMBOL>             set the ticker (changes the live context)
  date <YYYY-MM-DD>           set the analysis date (changes the live context)
  analysts <a,b,...>          market, social, news, fundamentals
  depth <1|3|5>               research depth
  start                       start an analysis for the current form
  open <agent>                show an agent's report, e.g. `open market` or `open bull`
  retry <report>              retry a failed report fetch
  final                       show the final analysis
  ping                        send a ping to the server
  show | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Show,
    Quit,
    Core(Msg),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}; type `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("unknown agent {0:?}")]
    UnknownAgent(String),
    #[error("unknown report {0:?}")]
    UnknownReport(String),
    #[error("depth must be a number, got {0:?}")]
    InvalidDepth(String),
}

// Short names accepted in addition to the full agent names.
const AGENT_ALIASES: [(&str, AgentId); 12] = [
    ("market", AgentId::MarketAnalyst),
    ("social", AgentId::SocialAnalyst),
    ("news", AgentId::NewsAnalyst),
    ("fundamentals", AgentId::FundamentalsAnalyst),
    ("bull", AgentId::BullResearcher),
    ("bear", AgentId::BearResearcher),
    ("manager", AgentId::ResearchManager),
    ("trader", AgentId::Trader),
    ("risky", AgentId::RiskyAnalyst),
    ("neutral", AgentId::NeutralAnalyst),
    ("safe", AgentId::SafeAnalyst),
    ("portfolio", AgentId::PortfolioManager),
];

/// Parses one input line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let verb = verb.to_ascii_lowercase();
    let require = |name: &'static str| {
        if rest.is_empty() {
            Err(CommandError::MissingArgument(name))
        } else {
            Ok(rest)
        }
    };

    let command = match verb.as_str() {
        "help" | "?" => Command::Help,
        "show" => Command::Show,
        "quit" | "exit" => Command::Quit,
        "connect" => Command::Core(Msg::Connect),
        "disconnect" => Command::Core(Msg::Disconnect),
        "ticker" => Command::Core(Msg::TickerEdited(require("ticker")?.to_string())),
        "date" => Command::Core(Msg::DateEdited(require("date")?.to_string())),
        "analysts" => Command::Core(Msg::AnalystsEdited(
            require("analysts")?
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|name| !name.is_empty())
                .map(str::to_ascii_lowercase)
                .collect(),
        )),
        "depth" => {
            let raw = require("depth")?;
            let depth = raw
                .parse()
                .map_err(|_| CommandError::InvalidDepth(raw.to_string()))?;
            Command::Core(Msg::DepthEdited(depth))
        }
        "start" => Command::Core(Msg::StartAnalysisClicked),
        "open" => Command::Core(Msg::OpenReport(parse_agent(require("open")?)?)),
        "retry" => {
            let raw = require("retry")?;
            let key = ReportKey::parse(&raw.to_ascii_lowercase())
                .ok_or_else(|| CommandError::UnknownReport(raw.to_string()))?;
            Command::Core(Msg::RetryReport(key))
        }
        "final" => Command::Core(Msg::OpenFinalAnalysis),
        "ping" => Command::Core(Msg::PingClicked),
        _ => return Err(CommandError::Unknown(verb)),
    };
    Ok(Some(command))
}

fn parse_agent(raw: &str) -> Result<AgentId, CommandError> {
    let wanted = raw.to_ascii_lowercase();
    AGENT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == wanted)
        .map(|(_, agent)| *agent)
        .or_else(|| {
            AgentId::ALL
                .into_iter()
                .find(|agent| agent.name().eq_ignore_ascii_case(&wanted))
        })
        .ok_or_else(|| CommandError::UnknownAgent(raw.to_string()))
}

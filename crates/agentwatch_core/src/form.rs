use serde::Serialize;
use thiserror::Error;

/// Analyst selections the backend understands.
pub const ANALYST_OPTIONS: [&str; 4] = ["market", "social", "news", "fundamentals"];

/// Research depth presets: shallow, medium, deep.
pub const RESEARCH_DEPTHS: [u8; 3] = [1, 3, 5];

/// User-editable inputs for starting an analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisForm {
    pub ticker: String,
    pub date: String,
    pub analysts: Vec<String>,
    pub research_depth: u8,
    pub llm_provider: String,
    pub backend_url: String,
    pub shallow_thinker: String,
    pub deep_thinker: String,
}

impl Default for AnalysisForm {
    fn default() -> Self {
        Self {
            ticker: String::new(),
            date: String::new(),
            analysts: ANALYST_OPTIONS.iter().map(|a| a.to_string()).collect(),
            research_depth: 1,
            llm_provider: "openai".to_string(),
            backend_url: "https://api.openai.com/v1".to_string(),
            shallow_thinker: "gpt-4o-mini".to_string(),
            deep_thinker: "o4-mini".to_string(),
        }
    }
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub analysis_date: String,
    pub analysts: Vec<String>,
    pub research_depth: u8,
    pub llm_provider: String,
    pub backend_url: String,
    pub shallow_thinker: String,
    pub deep_thinker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("ticker is required")]
    MissingTicker,
    #[error("ticker {0:?} must be 1-5 letters")]
    InvalidTicker(String),
    #[error("analysis date is required")]
    MissingDate,
    #[error("date {0:?} must be YYYY-MM-DD")]
    InvalidDate(String),
    #[error("select at least one analyst")]
    NoAnalysts,
    #[error("unknown analyst {0:?}")]
    UnknownAnalyst(String),
    #[error("research depth {0} is not one of 1, 3, 5")]
    InvalidDepth(u8),
}

impl AnalysisForm {
    /// Checks every field and collects all problems rather than stopping at
    /// the first one.
    pub fn validate(&self) -> Result<AnalysisRequest, Vec<FormError>> {
        let mut errors = Vec::new();

        let ticker = self.ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            errors.push(FormError::MissingTicker);
        } else if ticker.len() > 5 || !ticker.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(FormError::InvalidTicker(self.ticker.clone()));
        }

        let date = self.date.trim().to_string();
        if date.is_empty() {
            errors.push(FormError::MissingDate);
        } else if !is_iso_date(&date) {
            errors.push(FormError::InvalidDate(date.clone()));
        }

        if self.analysts.is_empty() {
            errors.push(FormError::NoAnalysts);
        }
        errors.extend(
            self.analysts
                .iter()
                .filter(|analyst| !ANALYST_OPTIONS.contains(&analyst.as_str()))
                .map(|analyst| FormError::UnknownAnalyst(analyst.clone())),
        );

        if !RESEARCH_DEPTHS.contains(&self.research_depth) {
            errors.push(FormError::InvalidDepth(self.research_depth));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(AnalysisRequest {
            ticker,
            analysis_date: date,
            analysts: self.analysts.clone(),
            research_depth: self.research_depth,
            llm_provider: self.llm_provider.clone(),
            backend_url: self.backend_url.clone(),
            shallow_thinker: self.shallow_thinker.clone(),
            deep_thinker: self.deep_thinker.clone(),
        })
    }
}

fn is_iso_date(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('-').collect();
    let &[year, month, day] = parts.as_slice() else {
        return false;
    };
    let digits =
        |part: &str, len: usize| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());
    if !(digits(year, 4) && digits(month, 2) && digits(day, 2)) {
        return false;
    }
    let month: u8 = month.parse().unwrap_or(0);
    let day: u8 = day.parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::{AnalysisForm, FormError};

    fn filled() -> AnalysisForm {
        AnalysisForm {
            ticker: "aapl".into(),
            date: "2024-01-01".into(),
            ..AnalysisForm::default()
        }
    }

    #[test]
    fn valid_form_uppercases_ticker() {
        let request = filled().validate().expect("valid form");
        assert_eq!(request.ticker, "AAPL");
        assert_eq!(request.analysis_date, "2024-01-01");
        assert_eq!(request.analysts.len(), 4);
    }

    #[test]
    fn empty_form_reports_every_missing_field() {
        let form = AnalysisForm {
            analysts: Vec::new(),
            ..AnalysisForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(vec![
                FormError::MissingTicker,
                FormError::MissingDate,
                FormError::NoAnalysts
            ])
        );
    }

    #[test]
    fn rejects_malformed_values() {
        let form = AnalysisForm {
            ticker: "BRK.B".into(),
            date: "2024-13-01".into(),
            analysts: vec!["market".into(), "astrology".into()],
            research_depth: 2,
            ..AnalysisForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FormError::InvalidTicker("BRK.B".into()),
                FormError::InvalidDate("2024-13-01".into()),
                FormError::UnknownAnalyst("astrology".into()),
                FormError::InvalidDepth(2),
            ]
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::interview::SessionError;
use crate::llm_client::prompts::{fill_template, INTERVIEWER_SYSTEM_TEMPLATE};

pub const NAME_MAX_CHARS: usize = 40;
pub const EXPERIENCE_MAX_CHARS: usize = 200;
pub const SKILLS_MAX_CHARS: usize = 200;

pub const POSITIONS: &[&str] = &[
    "Data Scientist",
    "Data Engineer",
    "ML Engineer",
    "BI Analyst",
    "Financial Analyst",
];

pub const COMPANIES: &[&str] = &[
    "Amazon",
    "Meta",
    "Udemy",
    "365 Company",
    "Nestle",
    "LinkedIn",
    "Spotify",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Junior,
    #[serde(rename = "Mid-level")]
    MidLevel,
    Senior,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Junior, Level::MidLevel, Level::Senior];

    pub fn label(self) -> &'static str {
        match self {
            Level::Junior => "Junior",
            Level::MidLevel => "Mid-level",
            Level::Senior => "Senior",
        }
    }
}

/// Candidate profile submitted from the setup form.
/// Fixed once the interview starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub experience: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_company")]
    pub company: String,
}

fn default_position() -> String {
    POSITIONS[0].to_string()
}

fn default_company() -> String {
    COMPANIES[0].to_string()
}

impl CandidateProfile {
    /// Trims every field and checks required fields, lengths and the
    /// position/company catalogs.
    pub fn normalized(self) -> Result<Self, SessionError> {
        let profile = CandidateProfile {
            name: self.name.trim().to_string(),
            experience: self.experience.trim().to_string(),
            skills: self.skills.trim().to_string(),
            level: self.level,
            position: self.position.trim().to_string(),
            company: self.company.trim().to_string(),
        };

        require("name", &profile.name, NAME_MAX_CHARS)?;
        require("experience", &profile.experience, EXPERIENCE_MAX_CHARS)?;
        if profile.skills.chars().count() > SKILLS_MAX_CHARS {
            return Err(SessionError::Validation(format!(
                "skills must be at most {SKILLS_MAX_CHARS} characters"
            )));
        }
        if !POSITIONS.contains(&profile.position.as_str()) {
            return Err(SessionError::Validation(format!(
                "unknown position '{}'",
                profile.position
            )));
        }
        if !COMPANIES.contains(&profile.company.as_str()) {
            return Err(SessionError::Validation(format!(
                "unknown company '{}'",
                profile.company
            )));
        }

        Ok(profile)
    }

    /// Builds the interviewer persona prompt for this candidate.
    pub fn interviewer_prompt(&self) -> String {
        fill_template(
            INTERVIEWER_SYSTEM_TEMPLATE,
            &[
                ("{name}", self.name.as_str()),
                ("{experience}", self.experience.as_str()),
                ("{skills}", self.skills.as_str()),
                ("{level}", self.level.label()),
                ("{position}", self.position.as_str()),
                ("{company}", self.company.as_str()),
            ],
        )
    }
}

fn require(field: &str, value: &str, max_chars: usize) -> Result<(), SessionError> {
    if value.is_empty() {
        return Err(SessionError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(SessionError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(())
}

use std::{collections::HashMap, fs};

use shared::domain::Candidate;

#[derive(Debug, Clone)]
pub struct Settings {
    pub candidate_a_label: String,
    pub candidate_b_label: String,
    pub fetch_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            candidate_a_label: "Candidate A".into(),
            candidate_b_label: "Candidate B".into(),
            fetch_timeout_ms: 5_000,
        }
    }
}

impl Settings {
    pub fn label_for(&self, candidate: Candidate) -> &str {
        match candidate {
            Candidate::A => &self.candidate_a_label,
            Candidate::B => &self.candidate_b_label,
        }
    }
}

/// Defaults, overlaid by an optional `ballot.toml` in the working directory,
/// overlaid by environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("ballot.toml") {
        apply_file_overrides(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("BALLOT_CANDIDATE_A_LABEL") {
        settings.candidate_a_label = v;
    }
    if let Ok(v) = std::env::var("BALLOT_CANDIDATE_B_LABEL") {
        settings.candidate_b_label = v;
    }
    if let Ok(v) = std::env::var("BALLOT_FETCH_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.fetch_timeout_ms = parsed;
        }
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("candidate_a_label") {
        settings.candidate_a_label = v.clone();
    }
    if let Some(v) = file_cfg.get("candidate_b_label") {
        settings.candidate_b_label = v.clone();
    }
    if let Some(v) = file_cfg.get("fetch_timeout_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.fetch_timeout_ms = parsed;
        }
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FetchResult, Stage, StageState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: Option<i64>,
    /// URL, file or directory path the fetcher reads from.
    pub source: String,
    /// Id of the importer configuration driving this feed.
    pub importer: String,
    pub stage_states: BTreeMap<Stage, StageState>,
    /// Fetch result kept between invocations while parsing is in progress.
    pub fetch_result: Option<FetchResult>,
    pub started: Option<i64>,
    pub imported: Option<i64>,
    pub locked: bool,
    pub created_at: Option<String>,
}

impl Feed {
    pub fn new(source: String, importer: String) -> Self {
        Self {
            id: None,
            source,
            importer,
            stage_states: BTreeMap::new(),
            fetch_result: None,
            started: None,
            imported: None,
            locked: false,
            created_at: None,
        }
    }

    /// Mutable state of `stage`, created fresh if the stage never ran.
    pub fn state(&mut self, stage: Stage) -> &mut StageState {
        self.stage_states.entry(stage).or_default()
    }

    /// Read-only view; a stage that never ran reads as a fresh state.
    pub fn state_of(&self, stage: Stage) -> StageState {
        self.stage_states.get(&stage).cloned().unwrap_or_default()
    }

    pub fn has_state(&self, stage: Stage) -> bool {
        self.stage_states.contains_key(&stage)
    }

    pub fn clear_state(&mut self, stage: Stage) {
        self.stage_states.remove(&stage);
    }

    /// Forget everything about the current import run.
    pub fn reset_import(&mut self) {
        self.clear_state(Stage::Fetch);
        self.clear_state(Stage::Parse);
        self.clear_state(Stage::Process);
        self.fetch_result = None;
        self.started = None;
    }
}

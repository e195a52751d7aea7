//! Batch coordinator: streams MARC entries through extraction and
//! classification, one entry and at most one write at a time.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::bib::{self, ParseOutcome};
use crate::config::ReconConfig;
use crate::decide::{Decision, DecisionEngine, FieldChange};
use crate::error::ReconError;
use crate::index::IdentifierIndex;
use crate::marc::MarcRecord;
use crate::progress::{Counter, ProgressReporter, RunStats, StatsSnapshot};
use crate::store::{ArchiveSink, RecordStore};

// ---------------------------------------------------------------------------
// Mode + state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Classify and count only. Nothing is written.
    #[default]
    Report,
    AddNewRecords,
    UpdateExistingRecords,
    /// Refresh the archived MARC copy of every matched record.
    UpdateMarcFiles,
}

impl RunMode {
    pub fn writes_creates(&self) -> bool {
        matches!(self, Self::AddNewRecords)
    }

    pub fn writes_updates(&self) -> bool {
        matches!(self, Self::UpdateExistingRecords)
    }

    pub fn archives_matches(&self) -> bool {
        matches!(self, Self::UpdateMarcFiles)
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::Report)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report => write!(f, "report"),
            Self::AddNewRecords => write!(f, "add-new-records"),
            Self::UpdateExistingRecords => write!(f, "update-existing-records"),
            Self::UpdateMarcFiles => write!(f, "update-marc-files"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report" => Ok(Self::Report),
            "add-new-records" => Ok(Self::AddNewRecords),
            "update-existing-records" => Ok(Self::UpdateExistingRecords),
            "update-marc-files" => Ok(Self::UpdateMarcFiles),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Streaming,
    Draining,
    Done,
    /// Absorbing: a duplicate control number, decode error or failed write.
    Fatal,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
}

/// One create or update the run decided on (written or not).
#[derive(Debug, Clone, Serialize)]
pub struct ActionEntry {
    pub action: Action,
    pub id: String,
    pub control_number: Option<String>,
    pub title: String,
    pub written: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub engine_version: String,
    pub run_at: String,
    pub stats: StatsSnapshot,
    pub actions: Vec<ActionEntry>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Date quoted in provenance notes.
    pub extracted_on: NaiveDate,
    pub progress_interval: Duration,
}

impl RunOptions {
    pub fn new(mode: RunMode, config: &ReconConfig) -> Self {
        Self {
            mode,
            extracted_on: chrono::Local::now().date_naive(),
            progress_interval: Duration::from_secs(config.progress_interval_secs),
        }
    }
}

pub struct Coordinator<'a> {
    config: &'a ReconConfig,
    options: RunOptions,
    index: IdentifierIndex,
    stats: Arc<RunStats>,
    state: RunState,
    actions: Vec<ActionEntry>,
}

impl<'a> Coordinator<'a> {
    pub fn new(config: &'a ReconConfig, index: IdentifierIndex, options: RunOptions) -> Self {
        Self {
            config,
            options,
            index,
            stats: Arc::new(RunStats::default()),
            state: RunState::Idle,
            actions: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn index(&self) -> &IdentifierIndex {
        &self.index
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Consume `entries` to the end. Any error moves the run to
    /// [`RunState::Fatal`] and is returned as-is.
    pub fn run<I, E>(
        &mut self,
        entries: I,
        store: &mut dyn RecordStore,
        archive: &mut dyn ArchiveSink,
    ) -> Result<RunSummary, ReconError>
    where
        I: IntoIterator<Item = Result<MarcRecord, E>>,
        E: fmt::Display,
    {
        if self.state != RunState::Idle {
            return Err(ReconError::ConfigValidation(format!(
                "coordinator already used (state {:?})",
                self.state
            )));
        }

        tracing::info!(mode = %self.options.mode, "reconciliation started");
        self.state = RunState::Streaming;
        let mut reporter =
            ProgressReporter::start(Arc::clone(&self.stats), self.options.progress_interval);
        let engine = DecisionEngine::new(self.config, self.options.extracted_on);

        for entry in entries {
            let result = entry
                .map_err(|e| ReconError::Parse(e.to_string()))
                .and_then(|record| self.process(&engine, &record, store, archive));
            if let Err(err) = result {
                self.state = RunState::Fatal;
                reporter.stop();
                tracing::error!(error = %err, "reconciliation aborted");
                return Err(err);
            }
        }

        self.state = RunState::Draining;
        reporter.stop();
        let stats = self.stats.snapshot();
        stats.log("reconciliation finished");
        self.state = RunState::Done;

        Ok(RunSummary {
            mode: self.options.mode,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            stats,
            actions: std::mem::take(&mut self.actions),
        })
    }

    fn process(
        &mut self,
        engine: &DecisionEngine<'_>,
        entry: &MarcRecord,
        store: &mut dyn RecordStore,
        archive: &mut dyn ArchiveSink,
    ) -> Result<(), ReconError> {
        self.stats.incr(Counter::Total);

        let parsed = match bib::parse(entry) {
            ParseOutcome::NotSerial => {
                self.stats.incr(Counter::NotSerial);
                return Ok(());
            }
            ParseOutcome::NotNewspaper => {
                self.stats.incr(Counter::NotNewspaper);
                return Ok(());
            }
            ParseOutcome::Newspaper(parsed) => parsed,
        };
        self.stats.incr(Counter::Newspapers);

        let mode = self.options.mode;
        match engine.classify(&parsed, &self.index, store)? {
            Decision::Skip(reason) => {
                tracing::debug!(control_number = ?parsed.primary_control_number(), %reason, "skipped");
                self.stats.incr(reason.into());
            }
            Decision::Unchanged { id } => {
                self.stats.incr(Counter::Matched);
                self.stats.incr(Counter::Unchanged);
                if mode.archives_matches() {
                    self.archive(archive, &id, entry)?;
                }
            }
            Decision::Update { record, changes, note } => {
                self.stats.incr(Counter::Matched);
                self.stats.incr(Counter::Updated);
                let id = record.id.clone();
                let title = record.title.clone();
                let control_number = record.control_number();
                tracing::debug!(%id, changes = changes.len(), "update");

                let written = mode.writes_updates();
                if written {
                    self.write(store, record, &note)?;
                }
                if written || mode.archives_matches() {
                    self.archive(archive, &id, entry)?;
                }
                self.actions.push(ActionEntry {
                    action: Action::Update,
                    id,
                    control_number,
                    title,
                    written,
                    changes,
                });
            }
            Decision::Create { record, note } => {
                self.stats.incr(Counter::Created);
                let id = record.id.clone();
                let title = record.title.clone();
                let control_number = record.control_number();
                tracing::debug!(%id, ?control_number, "create");

                let written = mode.writes_creates();
                if written {
                    self.write(store, record, &note)?;
                    if let Some(number) = &control_number {
                        self.index.register(number, &id, &title)?;
                    }
                    self.archive(archive, &id, entry)?;
                } else {
                    self.index.reserve_id(&id);
                }
                self.actions.push(ActionEntry {
                    action: Action::Create,
                    id,
                    control_number,
                    title,
                    written,
                    changes: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn write(
        &self,
        store: &mut dyn RecordStore,
        record: crate::model::NewspaperRecord,
        note: &str,
    ) -> Result<(), ReconError> {
        let id = record.id.clone();
        let revision = store
            .write(record, note)
            .map_err(|message| ReconError::Write { id: id.clone(), message })?;
        tracing::info!(%id, revision, "{note}");
        self.stats.incr(Counter::Written);
        Ok(())
    }

    fn archive(&self, archive: &mut dyn ArchiveSink, id: &str, entry: &MarcRecord) -> Result<(), ReconError> {
        archive.archive(id, entry).map_err(|message| ReconError::Write {
            id: id.to_string(),
            message,
        })?;
        self.stats.incr(Counter::Archived);
        Ok(())
    }
}

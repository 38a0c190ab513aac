//! The UI shell: a headless state machine over one extraction at a time.
//!
//! ```text
//! Idle ──begin──▶ Loading ──complete(Ok)──▶ Success ──reset──▶ Idle
//!                    │
//!                    └──complete(Err) / abandon──▶ Error ──reset──▶ Idle
//! ```
//!
//! A front-end owns one [`Shell`], feeds it uploads, and renders
//! [`Shell::state`] with [`crate::display::render_state`].

use crate::backend::VisionBackend;
use crate::error::ScanError;
use crate::export::{self, StatementExport};
use crate::extract::StatementExtractor;
use crate::output::StatementData;
use crate::pipeline::input::Upload;
use crate::pipeline::render::PageRasterizer;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error-state message for a run whose future was dropped before it finished.
pub const MSG_ABANDONED: &str = "Processing was interrupted. Please try again.";

/// Where the shell is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellState {
    /// Waiting for a file. Holds the message of the last intake rejection.
    Idle { intake_error: Option<String> },
    /// A run is in flight.
    Loading { file_name: String },
    /// The last run produced a statement.
    Success {
        file_name: String,
        data: StatementData,
    },
    /// The last run failed. `message` is user-facing.
    Error { message: String },
}

impl Default for ShellState {
    fn default() -> Self {
        ShellState::Idle { intake_error: None }
    }
}

impl ShellState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ShellState::Loading { .. })
    }
}

/// Refusals of a shell transition. The state is left as documented per variant.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A run is already in flight; nothing changed.
    #[error("An extraction is already in progress")]
    Busy,

    /// Intake refused the upload; the shell is Idle with the inline error.
    #[error("{}", .0.user_message())]
    Rejected(ScanError),

    /// The last result must be reset before a new file is taken.
    #[error("Reset the current result before submitting another file")]
    NotIdle,

    /// Export asked for outside Success.
    #[error("No extracted data to export")]
    NothingToExport,

    /// The export could not be produced.
    #[error(transparent)]
    Export(ScanError),
}

/// Identifies one accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketId(u64);

/// An accepted submission: the bytes to run and the id to complete with.
#[derive(Debug)]
pub struct Ticket {
    pub id: TicketId,
    pub file_name: String,
    pub pdf: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Shell {
    state: ShellState,
    next_id: u64,
    in_flight: Option<TicketId>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Take an upload. On success the shell is Loading and the caller runs
    /// the pipeline on the returned ticket.
    pub fn begin(&mut self, upload: Upload) -> Result<Ticket, ShellError> {
        match self.state {
            ShellState::Loading { .. } => {
                debug!("Refusing '{}': busy", upload.name);
                return Err(ShellError::Busy);
            }
            ShellState::Success { .. } | ShellState::Error { .. } => {
                return Err(ShellError::NotIdle);
            }
            ShellState::Idle { .. } => {}
        }

        if let Err(e) = upload.check() {
            warn!("{}", e);
            self.state = ShellState::Idle {
                intake_error: Some(e.user_message()),
            };
            return Err(ShellError::Rejected(e));
        }

        self.next_id += 1;
        let id = TicketId(self.next_id);
        self.in_flight = Some(id);
        self.state = ShellState::Loading {
            file_name: upload.name.clone(),
        };
        info!("Processing '{}' ({} bytes)", upload.name, upload.bytes.len());
        Ok(Ticket {
            id,
            file_name: upload.name,
            pdf: upload.bytes,
        })
    }

    /// Land the result of a run. Returns false, changing nothing, when `id`
    /// is not the run in flight.
    pub fn complete(&mut self, id: TicketId, result: Result<StatementData, ScanError>) -> bool {
        if self.in_flight != Some(id) {
            debug!("Ignoring stale completion {:?}", id);
            return false;
        }
        let file_name = match &self.state {
            ShellState::Loading { file_name } => file_name.clone(),
            _ => return false,
        };
        self.in_flight = None;
        self.state = match result {
            Ok(data) => ShellState::Success { file_name, data },
            Err(e) => {
                if e.is_pipeline_error() {
                    warn!("'{}' failed: {}", file_name, e);
                } else {
                    error!("'{}' hit an environment fault: {}", file_name, e);
                }
                ShellState::Error {
                    message: e.user_message(),
                }
            }
        };
        true
    }

    /// Give up on the run `id`: Loading → Error. Returns false, changing
    /// nothing, when `id` is not the run in flight.
    pub fn abandon(&mut self, id: TicketId) -> bool {
        if self.in_flight != Some(id) {
            return false;
        }
        warn!("Run {:?} abandoned before completing", id);
        self.in_flight = None;
        self.state = ShellState::Error {
            message: MSG_ABANDONED.to_string(),
        };
        true
    }

    /// Begin, run the pipeline, complete.
    ///
    /// Dropping the returned future mid-run (a timeout, a `select!`)
    /// abandons the run, so the shell lands in Error rather than staying
    /// Loading.
    pub async fn submit<R, B>(
        &mut self,
        upload: Upload,
        extractor: &StatementExtractor<'_, R, B>,
    ) -> Result<&ShellState, ShellError>
    where
        R: PageRasterizer,
        B: VisionBackend,
    {
        let ticket = self.begin(upload)?;
        {
            let mut guard = AbandonOnDrop {
                shell: &mut *self,
                id: ticket.id,
                armed: true,
            };
            let result = extractor.extract(ticket.pdf).await;
            guard.armed = false;
            guard.shell.complete(guard.id, result);
        }
        Ok(&self.state)
    }

    /// Back to a clean Idle. Refused while a run is in flight.
    pub fn reset(&mut self) -> Result<(), ShellError> {
        if self.state.is_loading() {
            return Err(ShellError::Busy);
        }
        self.state = ShellState::default();
        Ok(())
    }

    /// The JSON export of the current result.
    pub fn export(&self) -> Result<StatementExport, ShellError> {
        match &self.state {
            ShellState::Success { file_name, data } => {
                export::export(data, file_name).map_err(ShellError::Export)
            }
            _ => Err(ShellError::NothingToExport),
        }
    }
}

/// Abandons the in-flight run unless disarmed before it drops.
struct AbandonOnDrop<'s> {
    shell: &'s mut Shell,
    id: TicketId,
    armed: bool,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shell.abandon(self.id);
        }
    }
}

// ============================================================================
// EDITOR SESSION: the current image threaded through explicit commands
// ============================================================================
//
// Each command takes the current image, produces a new one and hands it back
// to the session; nothing else holds a reference to the working image. Which
// commands push a history snapshot is decided by the configured policy.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::canvas::PixelBuffer;
use crate::components::history::HistoryStack;
use crate::config::{EngineConfig, HistoryPolicy};
use crate::error::{EngineError, Result};
use crate::ops::adjustments::Filter;
use crate::ops::filters::{CancelToken, FilterExecutor};
use crate::ops::transform::{self, Axis, Interpolation};
use crate::{log_info, log_warn};

/// One user-level edit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditCommand {
    Filter(Filter),
    Flip(Axis),
    Rotate90,
    Resize { width: u32, height: u32 },
    Revert,
}

impl EditCommand {
    /// Whether the reference editor pushes a snapshot after this command.
    fn recorded_by_reference(&self) -> bool {
        matches!(
            self,
            EditCommand::Filter(Filter::GrayscaleLow) | EditCommand::Filter(Filter::ColorCorrection)
        )
    }
}

impl fmt::Display for EditCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditCommand::Filter(filter)             => write!(f, "{}", filter),
            EditCommand::Flip(axis)                 => write!(f, "flip-{}", axis),
            EditCommand::Rotate90                   => f.write_str("rotate-90"),
            EditCommand::Resize { width, height }   => write!(f, "resize={}x{}", width, height),
            EditCommand::Revert                     => f.write_str("revert"),
        }
    }
}

impl FromStr for EditCommand {
    type Err = EngineError;

    /// Accepts any filter name, `flip-horizontal`, `flip-vertical`,
    /// `rotate-90`, `resize=WxH` and `revert`.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        if let Some(size) = key.strip_prefix("resize=") {
            let (width, height) = parse_size(size)?;
            return Ok(EditCommand::Resize { width, height });
        }
        match key.as_str() {
            "flip-horizontal" | "flip-h" => Ok(EditCommand::Flip(Axis::Horizontal)),
            "flip-vertical" | "flip-v"   => Ok(EditCommand::Flip(Axis::Vertical)),
            "rotate-90" | "rotate"       => Ok(EditCommand::Rotate90),
            "revert" | "undo"            => Ok(EditCommand::Revert),
            _ => key
                .parse::<Filter>()
                .map(EditCommand::Filter)
                .map_err(|_| EngineError::InvalidCommand(s.to_string())),
        }
    }
}

/// Parse `WxH` (also accepts `X` or `*` as the separator).
pub fn parse_size(s: &str) -> Result<(u32, u32)> {
    let bad = || EngineError::InvalidCommand(format!("expected WIDTHxHEIGHT, got '{}'", s));
    let (w, h) = s
        .split_once(['x', 'X', '*'])
        .ok_or_else(bad)?;
    let w: u32 = w.trim().parse().map_err(|_| bad())?;
    let h: u32 = h.trim().parse().map_err(|_| bad())?;
    if w == 0 || h == 0 {
        return Err(bad());
    }
    Ok((w, h))
}

/// Editing session: current image, history and the executor that runs filters.
pub struct Editor {
    current: Option<PixelBuffer>,
    history: HistoryStack,
    executor: FilterExecutor,
    policy: HistoryPolicy,
    interpolation: Interpolation,
}

impl Default for Editor {
    fn default() -> Self {
        Self::with_executor(FilterExecutor::default(), HistoryPolicy::default())
    }
}

impl Editor {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let executor = FilterExecutor::from_config(config)?;
        Ok(Self::with_executor(executor, config.history_policy))
    }

    pub fn with_executor(executor: FilterExecutor, policy: HistoryPolicy) -> Self {
        Self {
            current: None,
            history: HistoryStack::new(),
            executor,
            policy,
            interpolation: Interpolation::default(),
        }
    }

    pub fn current(&self) -> Option<&PixelBuffer> {
        self.current.as_ref()
    }

    pub fn into_current(self) -> Option<PixelBuffer> {
        self.current
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Load a new working image. Always recorded.
    pub fn open(&mut self, buffer: PixelBuffer) {
        log_info!("Opened {}x{} image", buffer.width(), buffer.height());
        self.history.record_with("Open", buffer.clone());
        self.current = Some(buffer);
    }

    fn require_current(&self) -> Result<&PixelBuffer> {
        self.current.as_ref().ok_or(EngineError::NullImage)
    }

    /// Replace the working image and record it if the policy asks for it.
    fn commit(&mut self, command: EditCommand, result: PixelBuffer) {
        let record = match self.policy {
            HistoryPolicy::Reference => command.recorded_by_reference(),
            HistoryPolicy::EveryEdit => true,
        };
        if record {
            self.history.record_with(command.to_string(), result.clone());
            log_info!(
                "Recorded '{}' (depth {}, pending revert {})",
                command,
                self.history.depth(),
                self.history.pending_revert_count()
            );
        }
        self.current = Some(result);
    }

    pub fn apply_filter(&mut self, filter: Filter) -> Result<&PixelBuffer> {
        let result = self.executor.apply(self.require_current()?, filter)?;
        self.commit(EditCommand::Filter(filter), result);
        self.require_current()
    }

    /// Cancellable filter pass. On cancellation the working image is unchanged.
    pub fn apply_filter_cancellable(&mut self, filter: Filter, cancel: &CancelToken) -> Result<&PixelBuffer> {
        let result = self.executor.apply_cancellable(self.require_current()?, filter, cancel)?;
        self.commit(EditCommand::Filter(filter), result);
        self.require_current()
    }

    pub fn flip(&mut self, axis: Axis) -> Result<&PixelBuffer> {
        let result = transform::flip(self.require_current()?, axis);
        self.commit(EditCommand::Flip(axis), result);
        self.require_current()
    }

    pub fn rotate_90(&mut self) -> Result<&PixelBuffer> {
        let result = transform::rotate_90(self.require_current()?);
        self.commit(EditCommand::Rotate90, result);
        self.require_current()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<&PixelBuffer> {
        let result = transform::resize(self.require_current()?, width, height, self.interpolation)?;
        self.commit(EditCommand::Resize { width, height }, result);
        self.require_current()
    }

    /// Revert through the history stack. Returns `Ok(false)` when there was
    /// not enough history, in which case nothing changes.
    pub fn revert(&mut self) -> Result<bool> {
        self.require_current()?;
        match self.history.revert() {
            Ok(restored) => {
                log_info!(
                    "Reverted to {}x{} (depth {}, pending revert {})",
                    restored.width(),
                    restored.height(),
                    self.history.depth(),
                    self.history.pending_revert_count()
                );
                self.current = Some(restored);
                Ok(true)
            }
            Err(e @ EngineError::HistoryUnderflow { .. }) => {
                log_warn!("Revert ignored: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Run one command.
    pub fn execute(&mut self, command: EditCommand) -> Result<()> {
        match command {
            EditCommand::Filter(filter)           => self.apply_filter(filter).map(|_| ()),
            EditCommand::Flip(axis)               => self.flip(axis).map(|_| ()),
            EditCommand::Rotate90                 => self.rotate_90().map(|_| ()),
            EditCommand::Resize { width, height } => self.resize(width, height).map(|_| ()),
            EditCommand::Revert                   => self.revert().map(|_| ()),
        }
    }
}

//! Playback commands
//!
//! A closed set of command variants with a fixed capability surface:
//! `describe` for help text, `render_control` for the display layer, and
//! `execute` against a tenant's queue and controller. Name lookup is a
//! static match; no dynamic registration.

use crate::error::Result;
use crate::playback::{PlaybackController, Trigger};
use crate::queue::{SongQueue, DEFAULT_PAGE_SIZE};
use jbx_common::db::QueueOption;

/// Default seek distance for Forward/Backward, in seconds
pub const DEFAULT_JUMP_SECS: u64 = 10;

/// Everything a command may touch while executing
pub struct CommandContext<'a> {
    pub queue: &'a mut SongQueue,
    pub controller: &'a mut PlaybackController,
    /// Seek distance for Forward/Backward
    pub jump_secs: u64,
    /// Skip distance; defaults to 1
    pub skip_count: i64,
}

/// How the display layer should render one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    /// Greyed out when false
    pub enabled: bool,
    /// Highlighted when the command's mode flag is set
    pub active: bool,
}

/// The closed command set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Skip,
    Replay,
    Previous,
    Loop,
    LoopQueue,
    Shuffle,
    Clear,
    Stop,
    Forward,
    Backward,
    PageNext,
    PagePrev,
}

/// Static lookup table; order here is display order
pub const ALL_COMMANDS: &[Command] = &[
    Command::Previous,
    Command::Replay,
    Command::Skip,
    Command::Forward,
    Command::Backward,
    Command::Loop,
    Command::LoopQueue,
    Command::Shuffle,
    Command::PagePrev,
    Command::PageNext,
    Command::Clear,
    Command::Stop,
];

impl Command {
    /// Resolve a command by its wire name
    pub fn from_name(name: &str) -> Option<Command> {
        match name {
            "skip" => Some(Command::Skip),
            "replay" => Some(Command::Replay),
            "previous" => Some(Command::Previous),
            "loop" => Some(Command::Loop),
            "loop_queue" => Some(Command::LoopQueue),
            "shuffle" => Some(Command::Shuffle),
            "clear" => Some(Command::Clear),
            "stop" => Some(Command::Stop),
            "forward" => Some(Command::Forward),
            "backward" => Some(Command::Backward),
            "page_next" => Some(Command::PageNext),
            "page_prev" => Some(Command::PagePrev),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Skip => "skip",
            Command::Replay => "replay",
            Command::Previous => "previous",
            Command::Loop => "loop",
            Command::LoopQueue => "loop_queue",
            Command::Shuffle => "shuffle",
            Command::Clear => "clear",
            Command::Stop => "stop",
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::PageNext => "page_next",
            Command::PagePrev => "page_prev",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Command::Skip => "Skip to the next song",
            Command::Replay => "Restart the current song",
            Command::Previous => "Go back to the previously played song",
            Command::Loop => "Repeat the current song",
            Command::LoopQueue => "Re-append played songs to the end of the queue",
            Command::Shuffle => "Shuffle the queued songs",
            Command::Clear => "Remove every queued song",
            Command::Stop => "Stop playback and end the session",
            Command::Forward => "Seek forward in the current song",
            Command::Backward => "Seek backward in the current song",
            Command::PageNext => "Show the next page of the queue",
            Command::PagePrev => "Show the previous page of the queue",
        }
    }

    /// Control rendering state for the current queue size and flags
    pub fn render_control(&self, active_len: i64, options: &[QueueOption]) -> ControlState {
        let has = |o: QueueOption| options.contains(&o);
        match self {
            Command::Skip | Command::Replay | Command::Forward | Command::Backward => {
                ControlState {
                    enabled: active_len >= 1,
                    active: false,
                }
            }
            Command::Previous => ControlState {
                enabled: true,
                active: false,
            },
            Command::Loop => ControlState {
                enabled: active_len >= 1,
                active: has(QueueOption::Loop),
            },
            Command::LoopQueue => ControlState {
                enabled: active_len >= 3,
                active: has(QueueOption::LoopQueue),
            },
            Command::Shuffle => ControlState {
                enabled: active_len >= 3,
                active: false,
            },
            Command::Clear => ControlState {
                enabled: active_len >= 1,
                active: has(QueueOption::ClearSelected),
            },
            Command::Stop => ControlState {
                enabled: true,
                active: has(QueueOption::StopSelected),
            },
            Command::PageNext | Command::PagePrev => ControlState {
                enabled: active_len > DEFAULT_PAGE_SIZE,
                active: false,
            },
        }
    }

    /// Run the command against the tenant's queue and controller
    pub async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<()> {
        match self {
            Command::Skip => {
                ctx.controller
                    .trigger(Trigger::Skip(ctx.skip_count), ctx.queue)
                    .await
            }
            Command::Replay => ctx.controller.trigger(Trigger::Replay, ctx.queue).await,
            Command::Previous => ctx.controller.trigger(Trigger::Previous, ctx.queue).await,
            Command::Forward => {
                ctx.controller
                    .trigger(Trigger::JumpForward(ctx.jump_secs), ctx.queue)
                    .await
            }
            Command::Backward => {
                ctx.controller
                    .trigger(Trigger::JumpBackward(ctx.jump_secs), ctx.queue)
                    .await
            }
            Command::Loop => {
                // Loop and LoopQueue are mutually exclusive
                if ctx.queue.toggle_option(QueueOption::Loop).await? {
                    ctx.queue.clear_option(QueueOption::LoopQueue).await?;
                }
                Ok(())
            }
            Command::LoopQueue => {
                if ctx.queue.toggle_option(QueueOption::LoopQueue).await? {
                    ctx.queue.clear_option(QueueOption::Loop).await?;
                }
                Ok(())
            }
            Command::Shuffle => ctx.queue.shuffle_active().await,
            Command::Clear => {
                // First press arms the control; second press clears
                if ctx.queue.has_option(QueueOption::ClearSelected) {
                    ctx.queue.clear_option(QueueOption::ClearSelected).await?;
                    ctx.queue.clear().await?;
                    ctx.controller.kill().await;
                } else {
                    ctx.queue.set_option(QueueOption::ClearSelected).await?;
                }
                Ok(())
            }
            Command::Stop => {
                if ctx.queue.has_option(QueueOption::StopSelected) {
                    // Actual teardown is the session manager's job
                    ctx.controller.kill().await;
                } else {
                    ctx.queue.set_option(QueueOption::StopSelected).await?;
                }
                Ok(())
            }
            Command::PageNext => {
                let offset = ctx.queue.page_offset() + DEFAULT_PAGE_SIZE;
                ctx.queue.set_page_offset(offset, DEFAULT_PAGE_SIZE).await
            }
            Command::PagePrev => {
                let offset = (ctx.queue.page_offset() - DEFAULT_PAGE_SIZE).max(0);
                ctx.queue.set_page_offset(offset, DEFAULT_PAGE_SIZE).await
            }
        }
    }
}

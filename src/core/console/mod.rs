//! Realtime console.
//!
//! Everything the console page holds besides the realtime connection itself:
//! the session lifecycle, the aggregated event log, the chart carousel and
//! UI-only view flags.

mod charts;
mod event_log;
mod session;
mod view;

pub use charts::{ChartCarousel, ChartRecord};
pub use event_log::{AutoScroll, EventLog, EventSource, RealtimeEvent, aggregate, format_elapsed};
pub use session::{
    ConnectedPhase, ConsoleError, ConsoleEvent, ConsoleSession, SessionPhase,
    VOICE_ACTIVITY_WINDOW,
};
pub use view::{ConsoleFeatures, ConsoleView, DEFAULT_INSTRUCTIONS, EmbedPanel, EmbedState, Modal};

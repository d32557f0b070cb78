mod state;

pub use state::{AppState, ReportCache, SharedWindows};
pub(crate) use state::LATEST_REPORT_KEY;
pub use state::SUBSCRIPTIONS_KEY;

pub mod state;
pub mod walkthrough;

pub use state::AppState;
pub use walkthrough::{run, Plan, WalkthroughReport};

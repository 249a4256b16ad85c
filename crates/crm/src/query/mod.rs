//! Query API for dashboard views
//!
//! Read-side functions that turn stored rows into what each view renders:
//! conversation threads, message statistics and the lead board.

mod board;
mod stats;
mod threads;

pub use board::{BoardColumn, LeadBoard, load_board};
pub use stats::{MessageStats, account_stats};
pub use threads::{build_threads, find_thread, list_conversations, sort_by_recency};

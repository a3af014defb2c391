//! HTML dashboard.
//!
//! Builds view types from a store snapshot and renders them through an
//! Askama template. Refresh and probe toggling happen in the browser; the
//! toggles go through `/api/proxy`.

pub mod page;
pub mod views;

pub use page::{render_dashboard, DashboardPage};
pub use views::{build_cards, format_age, PodCardView, ProbeView};

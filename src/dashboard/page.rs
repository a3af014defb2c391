//! Dashboard page rendering.

use askama::Template;
use axum::response::Html;

use crate::dashboard::views::{build_cards, PodCardView};
use crate::probe::ProbeClient;
use crate::state::SnapshotReader;
use crate::version;

#[derive(Template)]
#[template(path = "index.html")]
pub struct DashboardPage {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub selector: String,
    pub instance_count: usize,
    pub cards: Vec<PodCardView>,
}

fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Template render failed");
        format!("<pre>Template error: {e}</pre>")
    }))
}

/// Render the dashboard for the current snapshot.
pub fn render_dashboard(snapshot: &SnapshotReader, client: &ProbeClient, selector: &str) -> Html<String> {
    let records = snapshot.current_snapshot();
    let cards = build_cards(&records, client);

    render(DashboardPage {
        version: version::VERSION,
        commit: version::GIT_COMMIT,
        build_time: version::BUILD_TIME,
        selector: selector.to_string(),
        instance_count: cards.len(),
        cards,
    })
}

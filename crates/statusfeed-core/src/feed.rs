use std::fmt::Write;

use crate::models::{NewFeedEntry, Observation};
use crate::util::escape_markup;

pub const OPERATIONAL_TITLE: &str = "All services appear to be operational";

/// Which summary style a feed entry uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// At least one service is in an error status.
    Issues,
    Operational,
}

impl EntryKind {
    pub fn for_observation(observation: &Observation) -> Self {
        if observation.has_errors() {
            EntryKind::Issues
        } else {
            EntryKind::Operational
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Issues => "issues",
            EntryKind::Operational => "operational",
        }
    }
}

/// Renders observations into feed entries.
#[derive(Debug, Clone)]
pub struct FeedWriter {
    site_name: String,
}

impl FeedWriter {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
        }
    }

    /// Build the entry for an observation, styled by whether it contains errors.
    pub fn entry_for(&self, observation: &Observation) -> NewFeedEntry {
        match EntryKind::for_observation(observation) {
            EntryKind::Issues => self.issues_entry(observation),
            EntryKind::Operational => self.operational_entry(observation),
        }
    }

    /// Lists only the services currently in an error status.
    pub fn issues_entry(&self, observation: &Observation) -> NewFeedEntry {
        let site = escape_markup(&self.site_name);
        let mut description = String::new();
        let mut affected = 0usize;

        let _ = write!(description, "<h2>{site} Reports Issues</h2>");
        let _ = write!(
            description,
            "<p>The {site} status page may be reporting issues. \
             The following services are experiencing problems:</p>"
        );
        description.push_str("<ul>");
        for entry in observation.errors() {
            push_item(&mut description, &entry.service.name, &entry.status.name);
            affected += 1;
        }
        description.push_str("</ul>");

        NewFeedEntry {
            title: format!("{affected} services reporting potential issues"),
            description,
            published_at: observation.captured_at(),
        }
    }

    /// Lists every service with its current status.
    pub fn operational_entry(&self, observation: &Observation) -> NewFeedEntry {
        let site = escape_markup(&self.site_name);
        let mut description = String::new();

        let _ = write!(description, "<h2>{site} Is Operational</h2>");
        let _ = write!(
            description,
            "<p>The {site} status page shows that all services appear to be operational.</p>"
        );
        description.push_str("<ul>");
        for entry in observation.statuses() {
            push_item(&mut description, &entry.service.name, &entry.status.name);
        }
        description.push_str("</ul>");

        NewFeedEntry {
            title: OPERATIONAL_TITLE.to_string(),
            description,
            published_at: observation.captured_at(),
        }
    }
}

fn push_item(out: &mut String, service: &str, status: &str) {
    let _ = write!(
        out,
        "<li>{} - {}</li>",
        escape_markup(service),
        escape_markup(status)
    );
}

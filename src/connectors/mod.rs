//! One module per SaaS backend. Each exposes `router()` with the
//! authenticated routes and a `client` module wrapping the backend API.

use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::app::AppState;

pub mod dynamics;
pub mod hubspot;
pub mod jira;
pub mod linkedin;
pub mod saba;
pub mod salesforce;
pub mod zendesk;

/// How a connector presents data to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStyle {
    /// Pollable notification cards.
    Cards,
    /// Bot objects answered on demand.
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    Jira,
    Salesforce,
    Hubspot,
    Zendesk,
    LinkedinLearning,
    Dynamics,
    Saba,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 7] = [
        ConnectorKind::Jira,
        ConnectorKind::Salesforce,
        ConnectorKind::Hubspot,
        ConnectorKind::Zendesk,
        ConnectorKind::LinkedinLearning,
        ConnectorKind::Dynamics,
        ConnectorKind::Saba,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ConnectorKind::Jira => "Jira Service Desk",
            ConnectorKind::Salesforce => "Salesforce",
            ConnectorKind::Hubspot => "HubSpot",
            ConnectorKind::Zendesk => "Zendesk",
            ConnectorKind::LinkedinLearning => "LinkedIn Learning",
            ConnectorKind::Dynamics => "Microsoft Dynamics",
            ConnectorKind::Saba => "Saba",
        }
    }

    pub fn style(self) -> ObjectStyle {
        match self {
            ConnectorKind::Jira
            | ConnectorKind::Salesforce
            | ConnectorKind::Hubspot
            | ConnectorKind::Zendesk => ObjectStyle::Cards,
            ConnectorKind::LinkedinLearning | ConnectorKind::Dynamics | ConnectorKind::Saba => {
                ObjectStyle::Bot
            }
        }
    }

    /// Public API documentation of the backend.
    pub fn doc_url(self) -> &'static str {
        match self {
            ConnectorKind::Jira => {
                "https://developer.atlassian.com/cloud/jira/service-desk/rest/"
            }
            ConnectorKind::Salesforce => {
                "https://developer.salesforce.com/docs/atlas.en-us.api_rest.meta/api_rest/"
            }
            ConnectorKind::Hubspot => "https://developers.hubspot.com/docs/api/crm/tickets",
            ConnectorKind::Zendesk => "https://developer.zendesk.com/api-reference/",
            ConnectorKind::LinkedinLearning => {
                "https://docs.microsoft.com/en-us/linkedin/learning/"
            }
            ConnectorKind::Dynamics => {
                "https://docs.microsoft.com/en-us/dynamics365/customer-engagement/web-api/"
            }
            ConnectorKind::Saba => "https://developer.saba.com/",
        }
    }

    pub fn brand_color(self) -> &'static str {
        match self {
            ConnectorKind::Jira => "#0052CC",
            ConnectorKind::Salesforce => "#00A1E0",
            ConnectorKind::Hubspot => "#FF7A59",
            ConnectorKind::Zendesk => "#03363D",
            ConnectorKind::LinkedinLearning => "#0A66C2",
            ConnectorKind::Dynamics => "#002050",
            ConnectorKind::Saba => "#E4002B",
        }
    }

    /// Authenticated routes for this connector, relative to the root.
    pub fn router(self) -> Router<Arc<AppState>> {
        match self {
            ConnectorKind::Jira => jira::router(),
            ConnectorKind::Salesforce => salesforce::router(),
            ConnectorKind::Hubspot => hubspot::router(),
            ConnectorKind::Zendesk => zendesk::router(),
            ConnectorKind::LinkedinLearning => linkedin::router(),
            ConnectorKind::Dynamics => dynamics::router(),
            ConnectorKind::Saba => saba::router(),
        }
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

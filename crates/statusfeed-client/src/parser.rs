use scraper::{ElementRef, Html, Selector};
use statusfeed_core::catalog::Catalog;
use statusfeed_core::error::AppError;
use statusfeed_core::models::{ObservedStatus, Service, StatusKind};
use statusfeed_core::traits::StatusParser;

pub const DEFAULT_SERVICE_SELECTOR: &str = "div.flex-col > p";
pub const DEFAULT_INDICATOR_SELECTOR: &str = "div.flex-col i";

/// CSS selectors locating service names and status indicators on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub service_selector: String,
    pub indicator_selector: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            service_selector: DEFAULT_SERVICE_SELECTOR.to_string(),
            indicator_selector: DEFAULT_INDICATOR_SELECTOR.to_string(),
        }
    }
}

impl ParserConfig {
    /// Read `STATUSFEED_SERVICE_SELECTOR` and `STATUSFEED_INDICATOR_SELECTOR`,
    /// falling back to the defaults when unset or blank.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            service_selector: pick("STATUSFEED_SERVICE_SELECTOR", DEFAULT_SERVICE_SELECTOR),
            indicator_selector: pick("STATUSFEED_INDICATOR_SELECTOR", DEFAULT_INDICATOR_SELECTOR),
        }
    }
}

/// Parses the status page with CSS selectors.
///
/// Service names and indicators are matched independently and paired by
/// position: the i-th recognised indicator belongs to the i-th recognised
/// service. The page must list every catalog service exactly once. Service
/// text is compared verbatim, surrounding whitespace included.
#[derive(Debug, Clone)]
pub struct SelectorParser {
    services: Selector,
    indicators: Selector,
}

impl SelectorParser {
    pub fn new(config: &ParserConfig) -> Result<Self, AppError> {
        Ok(Self {
            services: compile(&config.service_selector)?,
            indicators: compile(&config.indicator_selector)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid CSS selector '{selector}': {e}")))
}

/// First status kind whose token is one of the element's classes.
fn match_indicator<'a>(element: ElementRef<'_>, catalog: &'a Catalog) -> Option<&'a StatusKind> {
    catalog.statuses().iter().find(|kind| {
        element
            .value()
            .classes()
            .any(|class| class == kind.token)
    })
}

impl StatusParser for SelectorParser {
    fn parse(&self, html: &str, catalog: &Catalog) -> Result<Vec<ObservedStatus>, AppError> {
        let document = Html::parse_document(html);

        let services: Vec<&Service> = document
            .select(&self.services)
            .filter_map(|el| catalog.service(&el.text().collect::<String>()))
            .collect();

        let indicators: Vec<&StatusKind> = document
            .select(&self.indicators)
            .filter_map(|el| match_indicator(el, catalog))
            .collect();

        let expected = catalog.service_count();
        if services.len() != expected || indicators.len() != expected {
            return Err(AppError::StructuralMismatch {
                expected,
                services: services.len(),
                indicators: indicators.len(),
            });
        }

        let mut observed: Vec<ObservedStatus> = services
            .into_iter()
            .zip(indicators)
            .map(|(service, status)| ObservedStatus {
                service: service.clone(),
                status: status.clone(),
            })
            .collect();
        observed.sort_by(|a, b| a.service.name.cmp(&b.service.name));

        Ok(observed)
    }
}

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AnalysisError, FetchError, InferenceError};
use crate::extractor;
use crate::inference::ModelChoice;
use crate::prompt;

/// Source of raw page HTML. The production implementation drives a headless
/// browser; tests substitute canned pages.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Turns a prompt into generated email text.
pub trait DraftGenerator {
    fn generate(&self, model: ModelChoice, prompt: &str) -> Result<String, InferenceError>;
}

/// Progress notifications emitted while a request runs, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Fetching,
    /// The page was fetched and reduced to text; shown to the user while
    /// generation is still in flight.
    Scraped {
        title: Option<String>,
        excerpt: String,
    },
    Generating,
}

/// Everything produced for one analyzed URL. Lives only for the request.
#[derive(Debug, Clone)]
pub struct SiteAnalysis {
    pub url: String,
    pub title: Option<String>,
    pub excerpt: String,
    pub email: String,
}

/// Run the full pipeline for one URL: fetch, extract, truncate, prompt,
/// generate.
///
/// Strictly sequential; the first failing stage aborts the rest, so a fetch
/// failure never reaches the inference endpoint. An empty extraction is not
/// a failure: the request still runs so the user sees what the model was
/// given.
pub fn run(
    pages: &dyn PageSource,
    drafts: &dyn DraftGenerator,
    config: &AppConfig,
    url: &str,
    model: ModelChoice,
    mut observe: impl FnMut(StageEvent),
) -> Result<SiteAnalysis, AnalysisError> {
    observe(StageEvent::Fetching);
    let html = pages.fetch(url)?;

    let title = extractor::extract_title(&html);
    let text = extractor::extract_text(&html);
    if text.is_empty() {
        warn!(url, "no readable text extracted from page");
    }
    let excerpt = extractor::truncate_chars(&text, config.max_scrape_chars).to_string();
    info!(
        url,
        total_chars = text.chars().count(),
        excerpt_chars = excerpt.chars().count(),
        "page text extracted"
    );
    observe(StageEvent::Scraped {
        title: title.clone(),
        excerpt: excerpt.clone(),
    });

    let prompt = prompt::outreach_prompt(&excerpt, title.as_deref());
    observe(StageEvent::Generating);
    let email = drafts.generate(model, &prompt)?;
    info!(url, model = model.id(), "draft generated");

    Ok(SiteAnalysis {
        url: url.to_string(),
        title,
        excerpt,
        email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::cell::RefCell;

    struct FixturePage(&'static str);

    impl PageSource for FixturePage {
        fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingPage;

    impl PageSource for FailingPage {
        fn fetch(&self, url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status {
                status: 503,
                url: url.to_string(),
            })
        }
    }

    struct CountingDrafts {
        calls: Cell<usize>,
        prompts: RefCell<Vec<String>>,
    }

    impl CountingDrafts {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl DraftGenerator for CountingDrafts {
        fn generate(&self, _model: ModelChoice, prompt: &str) -> Result<String, InferenceError> {
            self.calls.set(self.calls.get() + 1);
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok("Subject: Hi\n\nDraft body.".to_string())
        }
    }

    fn test_config(max_scrape_chars: usize) -> AppConfig {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.max_scrape_chars = max_scrape_chars;
        config
    }

    const PAGE: &str = "<html><head><title>Acme Plumbing</title></head>\
<body><nav>Home About Contact</nav><p>We manually enter invoices.</p></body></html>";

    #[test]
    fn stages_run_in_order_and_produce_a_report() {
        let drafts = CountingDrafts::new();
        let mut events = Vec::new();
        let analysis = run(
            &FixturePage(PAGE),
            &drafts,
            &test_config(8_000),
            "https://acme.example",
            ModelChoice::Mistral7B,
            |event| events.push(event),
        )
        .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StageEvent::Fetching);
        assert!(matches!(events[1], StageEvent::Scraped { .. }));
        assert_eq!(events[2], StageEvent::Generating);

        assert_eq!(analysis.url, "https://acme.example");
        assert_eq!(analysis.title.as_deref(), Some("Acme Plumbing"));
        assert_eq!(analysis.excerpt, "We manually enter invoices.");
        assert_eq!(analysis.email, "Subject: Hi\n\nDraft body.");
        assert_eq!(drafts.calls.get(), 1);

        let prompts = drafts.prompts.borrow();
        assert!(prompts[0].contains("We manually enter invoices."));
        assert!(prompts[0].contains("Acme Plumbing"));
    }

    #[test]
    fn fetch_failure_short_circuits_before_generation() {
        let drafts = CountingDrafts::new();
        let mut events = Vec::new();
        let err = run(
            &FailingPage,
            &drafts,
            &test_config(8_000),
            "https://down.example",
            ModelChoice::Mistral7B,
            |event| events.push(event),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Fetch(FetchError::Status { status: 503, .. })
        ));
        assert_eq!(drafts.calls.get(), 0);
        assert_eq!(events, vec![StageEvent::Fetching]);
    }

    #[test]
    fn excerpt_is_bounded_by_the_configured_limit() {
        let drafts = CountingDrafts::new();
        let analysis = run(
            &FixturePage(PAGE),
            &drafts,
            &test_config(10),
            "https://acme.example",
            ModelChoice::Mistral7B,
            |_| {},
        )
        .unwrap();
        assert_eq!(analysis.excerpt, "We manuall");
        assert_eq!(analysis.excerpt.chars().count(), 10);
    }

    #[test]
    fn empty_page_still_reaches_generation() {
        let drafts = CountingDrafts::new();
        let analysis = run(
            &FixturePage("<html><body><script>void(0)</script></body></html>"),
            &drafts,
            &test_config(8_000),
            "https://blank.example",
            ModelChoice::Mistral7B,
            |_| {},
        )
        .unwrap();
        assert_eq!(analysis.excerpt, "");
        assert_eq!(drafts.calls.get(), 1);
    }
}

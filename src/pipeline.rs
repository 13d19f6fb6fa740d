//! The hydration pipeline: fetch, map, render, or fall back.
//!
//! Each [`Section`] is one pipeline instance with its own source and
//! layouts. A run moves every target of the section through
//! `Empty -> Loading -> {Hydrated | Fallback}`; targets missing from the
//! page are reported as `Absent` and never written.

use crate::cancel::CancellationToken;
use crate::content::ContentPayload;
use crate::fetch::ContentFetcher;
use crate::page::Page;
use crate::render::{Layout, RenderPlan};
use crate::{ConsoleLevel, ConsoleMessage, Error, Result, SourceConfig};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;

type ConsoleHandler = Arc<dyn Fn(&ConsoleMessage) + Send + Sync>;

/// One content endpoint and the page regions it feeds
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub source: SourceConfig,
    pub layouts: Vec<Layout>,
}

impl Section {
    pub fn new(name: impl Into<String>, source: SourceConfig) -> Self {
        Self {
            name: name.into(),
            source,
            layouts: Vec::new(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layouts.push(layout);
        self
    }

    /// Every region selector the section writes to, in layout order.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for target in self.layouts.iter().flat_map(Layout::targets) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }
}

/// Lifecycle of a render target within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Empty,
    Loading,
    Hydrated,
    Fallback,
    /// The region is not on the page
    Absent,
}

impl TargetState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TargetState::Hydrated | TargetState::Fallback | TargetState::Absent
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(self, next: TargetState) -> Result<TargetState> {
        use TargetState::*;
        match (self, next) {
            (Empty, Loading) | (Empty, Hydrated) | (Empty, Fallback) => Ok(next),
            (Loading, Hydrated) | (Loading, Fallback) => Ok(next),
            _ => Err(Error::RenderError(format!(
                "invalid target transition {:?} -> {:?}",
                self, next
            ))),
        }
    }
}

/// Final state of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub state: TargetState,
}

/// Why a section fell back to static content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Status, transport or body error (message preserved)
    Network(String),
    /// The fetch succeeded but carried no usable records
    EmptyResult,
    /// The page was torn down while the fetch was in flight
    Cancelled,
}

/// Result of running one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hydrated,
    Fallback(FallbackReason),
    /// Cancelled before anything was written
    Cancelled,
    /// None of the section's regions are on the page; nothing was fetched
    Skipped,
}

/// What a run did to the page
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub section: String,
    pub outcome: Outcome,
    pub targets: Vec<TargetReport>,
    /// Cards written across the section's card layouts
    pub cards: usize,
    /// List items dropped because they matched no card variant
    pub skipped_items: usize,
}

impl SectionReport {
    pub fn state_of(&self, target: &str) -> Option<TargetState> {
        self.targets
            .iter()
            .find(|t| t.target == target)
            .map(|t| t.state)
    }

    /// No target was left empty or loading.
    pub fn is_complete(&self) -> bool {
        self.targets.iter().all(|t| t.state.is_terminal())
    }
}

/// Diagnostics channel shared by the sections of a hydrator
#[derive(Clone, Default)]
pub struct Console {
    handler: Option<ConsoleHandler>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler<F>(cb: F) -> Self
    where
        F: Fn(&ConsoleMessage) + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(cb)),
        }
    }

    pub fn emit(&self, section: &str, level: ConsoleLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            ConsoleLevel::Log => info!("[{}] {}", section, text),
            ConsoleLevel::Warn => warn!("[{}] {}", section, text),
            ConsoleLevel::Error => error!("[{}] {}", section, text),
        }
        if let Some(cb) = &self.handler {
            cb(&ConsoleMessage {
                level,
                section: section.to_string(),
                text,
            });
        }
    }
}

/// Target states of a run waiting for its fetch
#[derive(Debug)]
pub struct Pending {
    states: Vec<TargetReport>,
}

/// Result of [`Pipeline::begin`]
#[derive(Debug)]
pub enum Started {
    /// The run ended without fetching (cancelled, or nothing to render)
    Done(SectionReport),
    /// Targets are prepared; fetch, then call [`Pipeline::finish`]
    Pending(Pending),
}

/// Runs one section against a page
pub struct Pipeline<'a> {
    section: &'a Section,
    console: &'a Console,
    cancel: &'a CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(section: &'a Section, console: &'a Console, cancel: &'a CancellationToken) -> Self {
        Self {
            section,
            console,
            cancel,
        }
    }

    /// Fetch and render in one call.
    pub fn run<F: ContentFetcher + ?Sized>(&self, fetcher: &F, page: &mut Page) -> Result<SectionReport> {
        match self.begin(page)? {
            Started::Done(report) => Ok(report),
            Started::Pending(pending) => {
                let fetched = fetcher.fetch(&self.section.source);
                self.finish(page, pending, Some(fetched))
            }
        }
    }

    /// Check target presence and write loading placeholders.
    pub fn begin(&self, page: &mut Page) -> Result<Started> {
        let name = &self.section.name;
        let mut states = Vec::new();
        for target in self.section.targets() {
            let state = if page.contains(target)? {
                TargetState::Empty
            } else {
                TargetState::Absent
            };
            states.push(TargetReport {
                target: target.to_string(),
                state,
            });
        }

        if self.cancel.is_cancelled() {
            self.console
                .emit(name, ConsoleLevel::Warn, "cancelled before start; page untouched");
            return Ok(Started::Done(self.report(Outcome::Cancelled, states)));
        }

        if states.iter().all(|t| t.state == TargetState::Absent) {
            self.console
                .emit(name, ConsoleLevel::Log, "no target regions on this page; skipping");
            return Ok(Started::Done(self.report(Outcome::Skipped, states)));
        }

        let mut pending = Pending { states };
        for layout in &self.section.layouts {
            if let Some((target, markup)) = layout.loading() {
                if page.replace_children(target, markup)? {
                    set_state(&mut pending.states, target, TargetState::Loading)?;
                }
            }
        }

        self.console.emit(
            name,
            ConsoleLevel::Log,
            format!("fetching content from endpoint '{}'", self.section.source.endpoint),
        );
        Ok(Started::Pending(pending))
    }

    /// Render the fetched payload, or the fallback.
    ///
    /// `fetched` is `None` when the fetch was abandoned because the token
    /// was cancelled while it was in flight.
    pub fn finish(
        &self,
        page: &mut Page,
        pending: Pending,
        fetched: Option<Result<ContentPayload>>,
    ) -> Result<SectionReport> {
        let name = &self.section.name;
        let fetched = match fetched {
            Some(_) if self.cancel.is_cancelled() => Err(Error::Cancelled),
            Some(result) => result,
            None => Err(Error::Cancelled),
        };

        let layouts = &self.section.layouts;
        let (plans, outcome): (Vec<(RenderPlan, bool)>, Outcome) = match fetched {
            Ok(payload) => {
                let plans: Vec<(RenderPlan, bool)> = layouts
                    .iter()
                    .map(|layout| match layout.plan(&payload) {
                        Some(plan) => (plan, true),
                        None => (layout.fallback(), false),
                    })
                    .collect();
                if plans.iter().any(|(_, hydrated)| *hydrated) {
                    (plans, Outcome::Hydrated)
                } else {
                    self.console
                        .emit(name, ConsoleLevel::Error, format!("{}; showing fallback content", Error::EmptyResult));
                    (plans, Outcome::Fallback(FallbackReason::EmptyResult))
                }
            }
            Err(Error::Cancelled) => {
                self.console.emit(
                    name,
                    ConsoleLevel::Warn,
                    "cancelled while fetching; showing fallback content",
                );
                (fallbacks(layouts), Outcome::Fallback(FallbackReason::Cancelled))
            }
            Err(err) => {
                self.console.emit(
                    name,
                    ConsoleLevel::Error,
                    format!("failed to fetch content: {}", err),
                );
                (
                    fallbacks(layouts),
                    Outcome::Fallback(FallbackReason::Network(err.to_string())),
                )
            }
        };

        let mut states = pending.states;
        let mut cards = 0;
        let mut skipped_items = 0;
        for (plan, hydrated) in &plans {
            let next = if *hydrated {
                TargetState::Hydrated
            } else {
                TargetState::Fallback
            };
            for target in plan.apply(page)? {
                set_state(&mut states, &target, next)?;
            }
            for target in &plan.kept {
                set_state(&mut states, target, TargetState::Fallback)?;
            }
            cards += plan.cards;
            skipped_items += plan.skipped;
        }

        if skipped_items > 0 {
            self.console.emit(
                name,
                ConsoleLevel::Warn,
                format!("{} item(s) matched no card layout and were skipped", skipped_items),
            );
        }
        if outcome == Outcome::Hydrated {
            self.console
                .emit(name, ConsoleLevel::Log, format!("hydrated ({} cards)", cards));
        }

        let mut report = self.report(outcome, states);
        report.cards = cards;
        report.skipped_items = skipped_items;
        Ok(report)
    }

    fn report(&self, outcome: Outcome, targets: Vec<TargetReport>) -> SectionReport {
        SectionReport {
            section: self.section.name.clone(),
            outcome,
            targets,
            cards: 0,
            skipped_items: 0,
        }
    }
}

fn fallbacks(layouts: &[Layout]) -> Vec<(RenderPlan, bool)> {
    layouts.iter().map(|l| (l.fallback(), false)).collect()
}

fn set_state(states: &mut [TargetReport], target: &str, next: TargetState) -> Result<()> {
    if let Some(entry) = states.iter_mut().find(|t| t.target == target) {
        if entry.state != TargetState::Absent {
            entry.state = entry.state.advance(next)?;
        }
    }
    Ok(())
}

/// Runs a set of independent sections against pages
pub struct Hydrator<F> {
    fetcher: F,
    sections: Vec<Section>,
    console: Console,
    cancel: CancellationToken,
}

impl<F: ContentFetcher> Hydrator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            sections: Vec::new(),
            console: Console::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Use `token` instead of the hydrator's own cancellation token.
    ///
    /// Pass a host token's `child_token()` to tie runs to page teardown
    /// without letting the hydrator cancel the host.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs of this hydrator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register a callback for diagnostics entries.
    pub fn on_console<C>(&mut self, cb: C)
    where
        C: Fn(&ConsoleMessage) + Send + Sync + 'static,
    {
        self.console = Console::with_handler(cb);
    }

    /// Remove previously registered on_console callback if any
    pub fn clear_on_console(&mut self) {
        self.console = Console::new();
    }

    /// Run the section called `name`.
    pub fn run(&self, page: &mut Page, name: &str) -> Result<SectionReport> {
        let section = self
            .sections
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::ConfigError(format!("no section named '{}'", name)))?;
        self.pipeline(section).run(&self.fetcher, page)
    }

    /// Run every section in order. A failing section never stops the others.
    pub fn run_all(&self, page: &mut Page) -> Vec<Result<SectionReport>> {
        self.sections
            .iter()
            .map(|section| self.pipeline(section).run(&self.fetcher, page))
            .collect()
    }

    pub(crate) fn pipeline<'a>(&'a self, section: &'a Section) -> Pipeline<'a> {
        Pipeline::new(section, &self.console, &self.cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::sections;
    use serde_json::json;
    use std::sync::Mutex;

    const PAGE: &str = r#"<html><body>
<section class="features"><div class="features-grid"><p>static features</p></div></section>
<div class="job-positions"><p>static jobs</p></div>
</body></html>"#;

    fn source(endpoint: &str) -> SourceConfig {
        SourceConfig::new("test", endpoint, "key")
    }

    fn collect_console<F: ContentFetcher>(hydrator: &mut Hydrator<F>) -> Arc<Mutex<Vec<ConsoleMessage>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        hydrator.on_console(move |msg| sink.lock().unwrap().push(msg.clone()));
        log
    }

    #[test]
    fn state_machine_transitions() {
        use TargetState::*;
        assert_eq!(Empty.advance(Loading).unwrap(), Loading);
        assert_eq!(Loading.advance(Hydrated).unwrap(), Hydrated);
        assert_eq!(Empty.advance(Fallback).unwrap(), Fallback);
        assert!(Hydrated.advance(Fallback).is_err());
        assert!(Fallback.advance(Hydrated).is_err());
        assert!(Loading.advance(Loading).is_err());
        assert!(Absent.advance(Hydrated).is_err());
    }

    #[test]
    fn server_error_falls_back_with_one_error_entry() {
        let fetcher = StaticFetcher::new().with_status("recruitment", 500);
        let mut hydrator =
            Hydrator::new(fetcher).with_section(sections::recruitment(source("recruitment")));
        let log = collect_console(&mut hydrator);

        let mut page = Page::parse(PAGE);
        let report = hydrator.run(&mut page, "recruitment").unwrap();

        assert!(matches!(report.outcome, Outcome::Fallback(FallbackReason::Network(_))));
        assert_eq!(report.state_of(".job-positions"), Some(TargetState::Fallback));
        assert!(report.is_complete());
        assert_eq!(page.count(".job-positions .job-card").unwrap(), 3);
        assert_eq!(page.count(".job-positions .loading").unwrap(), 0);

        let errors = log
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.level == ConsoleLevel::Error)
            .count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn absent_targets_skip_the_fetch() {
        let fetcher = StaticFetcher::new().with_json("heavy-visit-care", &json!({"welfare": "A"}));
        let hydrator = Hydrator::new(fetcher.clone())
            .with_section(sections::cost_limits(source("heavy-visit-care")));

        let mut page = Page::parse(PAGE);
        let before = page.html();
        let report = hydrator.run(&mut page, "cost-limits").unwrap();

        assert_eq!(report.outcome, Outcome::Skipped);
        assert!(report.targets.iter().all(|t| t.state == TargetState::Absent));
        assert_eq!(fetcher.request_count(), 0);
        assert_eq!(page.html(), before);
    }

    #[test]
    fn cancelled_before_start_leaves_page_untouched() {
        let fetcher = StaticFetcher::new().with_json("toppage", &json!({"featurestitle1": "A"}));
        let hydrator = Hydrator::new(fetcher.clone()).with_section(sections::toppage(source("toppage")));
        hydrator.cancellation_token().cancel();

        let mut page = Page::parse(PAGE);
        let before = page.html();
        let report = hydrator.run(&mut page, "toppage").unwrap();

        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(fetcher.request_count(), 0);
        assert_eq!(page.html(), before);
    }

    #[test]
    fn cancelled_mid_flight_writes_fallback() {
        let section = sections::recruitment(source("recruitment"));
        let console = Console::new();
        let cancel = CancellationToken::new();
        let pipeline = Pipeline::new(&section, &console, &cancel);

        let mut page = Page::parse(PAGE);
        let pending = match pipeline.begin(&mut page).unwrap() {
            Started::Pending(p) => p,
            Started::Done(r) => panic!("unexpected early finish: {:?}", r.outcome),
        };
        assert_eq!(page.count(".job-positions .loading").unwrap(), 1);

        cancel.cancel();
        let report = pipeline.finish(&mut page, pending, None).unwrap();
        assert_eq!(report.outcome, Outcome::Fallback(FallbackReason::Cancelled));
        assert_eq!(report.state_of(".job-positions"), Some(TargetState::Fallback));
        assert_eq!(page.count(".job-positions .loading").unwrap(), 0);
        assert_eq!(page.count(".job-positions .job-card").unwrap(), 3);
    }

    #[test]
    fn unknown_section_is_config_error() {
        let hydrator = Hydrator::new(StaticFetcher::new());
        let mut page = Page::parse(PAGE);
        assert!(matches!(hydrator.run(&mut page, "nope"), Err(Error::ConfigError(_))));
    }

    #[test]
    fn one_failing_section_does_not_affect_another() {
        let fetcher = StaticFetcher::new()
            .with_json("toppage", &json!({"featurestitle1": "A"}))
            .with_status("recruitment", 503);
        let hydrator = Hydrator::new(fetcher)
            .with_section(sections::recruitment(source("recruitment")))
            .with_section(sections::toppage(source("toppage")));

        let mut page = Page::parse(PAGE);
        let reports: Vec<SectionReport> = hydrator
            .run_all(&mut page)
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();

        assert!(matches!(reports[0].outcome, Outcome::Fallback(_)));
        assert_eq!(reports[1].outcome, Outcome::Hydrated);
        assert_eq!(reports[1].state_of(".features-grid"), Some(TargetState::Hydrated));
        assert_eq!(reports[1].state_of(".concept-heading"), Some(TargetState::Absent));
        assert!(page.html().contains("<h5 class=\"feature-title\">A</h5>"));
    }

    #[test]
    fn reports_serialize_for_tooling() {
        let report = SectionReport {
            section: "recruitment".into(),
            outcome: Outcome::Fallback(FallbackReason::EmptyResult),
            targets: vec![TargetReport {
                target: ".job-positions".into(),
                state: TargetState::Fallback,
            }],
            cards: 0,
            skipped_items: 0,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"], json!({"fallback": "empty_result"}));
        assert_eq!(value["targets"][0]["state"], "fallback");
    }

    #[test]
    fn list_body_with_empty_first_record_falls_back() {
        for body in [json!({"contents": [{}]}), json!({"contents": [7]})] {
            let fetcher = StaticFetcher::new().with_json("toppage", &body);
            let mut hydrator =
                Hydrator::new(fetcher).with_section(sections::toppage(source("toppage")));
            let log = collect_console(&mut hydrator);

            let mut page = Page::parse(PAGE);
            let report = hydrator.run(&mut page, "toppage").unwrap();
            assert_eq!(report.outcome, Outcome::Fallback(FallbackReason::EmptyResult), "{}", body);
            assert_eq!(report.state_of(".features-grid"), Some(TargetState::Fallback));
            assert_eq!(page.count(".feature-card").unwrap(), 3);
            let errors = log
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.level == ConsoleLevel::Error)
                .count();
            assert_eq!(errors, 1);
        }
    }
}

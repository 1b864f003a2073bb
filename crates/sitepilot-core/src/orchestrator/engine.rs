//! The turn orchestrator.
//!
//! One message in, one assistant message out. Every turn loads the
//! conversation's named state slots, decides which sub-protocol owns the
//! message, and persists the slots it changed together with both messages.
//! Nothing is kept in memory between turns.

use std::sync::Arc;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use sitepilot_types::config::SitePilotConfig;
use sitepilot_types::contract::{DesignIntentState, VoiceContract};
use sitepilot_types::conversation::{AdvisoryMode, Awaiting, ConversationId, ConversationMessage};
use sitepilot_types::draft::{
    ContentTool, Draft, DraftKind, PresentationTool, RecommendationChoice, RecommendationDraft,
    ReleaseTool, StructureTool, ToolCall,
};
use sitepilot_types::error::TurnError;
use sitepilot_types::llm::{MessageRole, StreamEvent};
use sitepilot_types::plan::{PlanStatus, SitePlanState};
use sitepilot_types::recommendation::{
    Recommendation, RecommendationRecord, RecommendationStatus,
};
use sitepilot_types::site::{PageKind, Section, SiteData, SiteId};
use sitepilot_types::snapshot::{Snapshot, SnapshotState};
use sitepilot_types::turn::{StreamRecord, TurnMode, TurnResponse};

use super::gates::{GateFailure, check_gates};
use super::intent::{Classification, IntentClassifier, IntentTag, RegexIntentClassifier};
use super::prompts;
use super::proposal::{
    ReleaseRequest, content_target, describe_presentation, describe_release, parse_release,
    presentation_proposal, render_plan, render_recommendations, site_name,
};
use super::reply::Reply;
use super::state::{Pending, TurnState};
use super::stream::FieldPatchExtractor;
use crate::audit::{format_report, run_audit};
use crate::contract::design::{
    DesignChoice, derive_intent, design_intent_message, ready_message, theme_for,
};
use crate::contract::intake::{apply_intake_answers, intake_questions, intake_summary};
use crate::contract::voice::{apply_voice_answers, voice_questions};
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::generative::{GenerationError, GenerationPrompt, GenerativeService};
use crate::repository::conversation::ConversationStore;
use crate::repository::insight::InsightRepository;
use crate::repository::site::SiteRepository;
use crate::scoring::{RecommendationEngine, key_history};
use crate::tools::{ToolContext, ToolExecutor, ToolOutcome};
use crate::validate::Violations;
use crate::view::SiteView;

/// One inbound message turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub conversation_id: ConversationId,
    pub message: String,
    /// Verified user id from the identity collaborator; `None` is anonymous.
    pub user_id: Option<String>,
    pub site_id: Option<SiteId>,
    /// Page id or section id the request focuses on.
    pub scope: Option<String>,
}

/// What a turn produced, before it is persisted.
#[derive(Debug)]
struct Outcome {
    mode: TurnMode,
    message: String,
    payload: Map<String, Value>,
}

impl Outcome {
    fn new(mode: TurnMode, message: impl Into<String>) -> Self {
        Self {
            mode,
            message: message.into(),
            payload: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.payload.insert(key.to_string(), v);
            }
            Err(e) => warn!(key, error = %e, "Payload field not serializable"),
        }
        self
    }

    fn unable(what: &str, violations: Violations) -> Self {
        Self::new(
            TurnMode::Advisor,
            format!(
                "I couldn't produce {what} that passes the site rules, so nothing was staged. \
                 Try rephrasing the request."
            ),
        )
        .with("violations", violations)
    }
}

/// Copy generation for one section; the only long-running step of a turn.
struct ContentJob {
    page: PageKind,
    section: Section,
    prompt: GenerationPrompt,
    preface: Option<String>,
    recommendation: Option<RecommendationChoice>,
}

enum Step {
    Done(Outcome),
    Content(ContentJob),
}

impl From<Outcome> for Step {
    fn from(outcome: Outcome) -> Self {
        Step::Done(outcome)
    }
}

impl Step {
    fn prefaced(self, preface: Option<String>) -> Self {
        let Some(preface) = preface else {
            return self;
        };
        match self {
            Step::Done(mut outcome) => {
                outcome.message = format!("{preface}\n\n{}", outcome.message);
                Step::Done(outcome)
            }
            Step::Content(mut job) => {
                job.preface = Some(preface);
                Step::Content(job)
            }
        }
    }
}

/// Drives conversations against the three stores and the generative service.
pub struct TurnOrchestrator<C, S, I>
where
    C: ConversationStore,
    S: SiteRepository,
    I: InsightRepository,
{
    conversations: Arc<C>,
    sites: Arc<S>,
    insights: Arc<I>,
    tools: ToolExecutor<S>,
    generative: GenerativeService,
    recommender: RecommendationEngine,
    classifier: Box<dyn IntentClassifier>,
    history_limit: u32,
}

impl<C, S, I> TurnOrchestrator<C, S, I>
where
    C: ConversationStore + 'static,
    S: SiteRepository + 'static,
    I: InsightRepository + 'static,
{
    pub fn new(
        conversations: Arc<C>,
        sites: Arc<S>,
        insights: Arc<I>,
        provider: Arc<BoxLlmProvider>,
        config: &SitePilotConfig,
    ) -> Self {
        Self {
            conversations,
            tools: ToolExecutor::new(sites.clone()),
            sites,
            insights,
            generative: GenerativeService::new(provider, config),
            recommender: RecommendationEngine::new(config.recommendation.clone()),
            classifier: Box::new(RegexIntentClassifier::default()),
            history_limit: config.history_limit,
        }
    }

    /// Replace the default regex classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Process one message turn to completion.
    ///
    /// 1. Load the conversation's slots and recent history
    /// 2. Route the message (pending draft, contracts, gates, intent)
    /// 3. Run the content generation if the route asked for one
    /// 4. Persist changed slots and both messages, then respond
    pub async fn handle_turn(&self, input: TurnInput) -> Result<TurnResponse, TurnError> {
        let span = info_span!(
            "turn",
            conversation_id = %input.conversation_id,
            mode = tracing::field::Empty,
        );
        async {
            let mut state = self.load(&input).await?;
            let before = state.clone();
            let step = self.route_or_discard(&input, &mut state, &before).await?;
            let outcome = match step {
                Step::Done(outcome) => outcome,
                Step::Content(job) => {
                    let section = job.section.clone();
                    let result = self
                        .generative
                        .generate(job.prompt.clone(), |raw| prompts::check_content_reply(raw, &section))
                        .await;
                    self.conclude_content(job, result, &mut state).await?
                }
            };
            self.finish(&input, &mut state, &before, outcome).await
        }
        .instrument(span)
        .await
    }

    /// Streaming variant for content drafts.
    ///
    /// Top-level content fields are emitted as `{path, value}` records as they
    /// finish parsing, followed by one `__final__` record with the turn
    /// envelope. Turns that do not draft copy emit only the final record.
    /// Cancelling the token aborts the generative call and persists nothing.
    pub fn stream_turn(
        self: Arc<Self>,
        input: TurnInput,
        cancel: CancellationToken,
    ) -> impl Stream<Item = StreamRecord> + Send + 'static {
        enum Next<T> {
            Cancelled,
            Ready(T),
        }

        let span = info_span!(
            "turn",
            conversation_id = %input.conversation_id,
            mode = tracing::field::Empty,
            streaming = true,
        );

        async_stream::stream! {
            let mut state = match self.load(&input).instrument(span.clone()).await {
                Ok(state) => state,
                Err(e) => {
                    yield StreamRecord::Error { message: e.to_string() };
                    return;
                }
            };
            let before = state.clone();
            let step = match self
                .route_or_discard(&input, &mut state, &before)
                .instrument(span.clone())
                .await
            {
                Ok(step) => step,
                Err(e) => {
                    yield StreamRecord::Error { message: e.to_string() };
                    return;
                }
            };

            let outcome = match step {
                Step::Done(outcome) => outcome,
                Step::Content(job) => {
                    let mut events = self.generative.stream_text(&job.prompt);
                    let mut extractor = FieldPatchExtractor::new();
                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Next::Cancelled,
                            event = events.next() => Next::Ready(event),
                        };
                        match next {
                            Next::Cancelled => {
                                info!(parent: &span, "Stream cancelled; nothing persisted");
                                return;
                            }
                            Next::Ready(Some(Ok(StreamEvent::TextDelta { text }))) => {
                                for (path, value) in extractor.push(&text) {
                                    yield StreamRecord::Patch { path, value };
                                }
                            }
                            Next::Ready(Some(Ok(_))) => {}
                            Next::Ready(Some(Err(e))) => {
                                warn!(parent: &span, error = %e, "Content stream failed");
                                yield StreamRecord::Error { message: TurnError::from(e).to_string() };
                                return;
                            }
                            Next::Ready(None) => break,
                        }
                    }

                    let section = job.section.clone();
                    let validated = self.generative.generate_from(
                        job.prompt.clone(),
                        Some(extractor.text().to_string()),
                        |raw| prompts::check_content_reply(raw, &section),
                    );
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Next::Cancelled,
                        result = validated.instrument(span.clone()) => Next::Ready(result),
                    };
                    let Next::Ready(result) = result else {
                        info!(parent: &span, "Stream cancelled; nothing persisted");
                        return;
                    };
                    match self
                        .conclude_content(job, result, &mut state)
                        .instrument(span.clone())
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            yield StreamRecord::Error { message: e.to_string() };
                            return;
                        }
                    }
                }
            };

            match self
                .finish(&input, &mut state, &before, outcome)
                .instrument(span.clone())
                .await
            {
                Ok(response) => match serde_json::to_value(&response) {
                    Ok(final_object) => yield StreamRecord::Final { final_object },
                    Err(e) => yield StreamRecord::Error { message: e.to_string() },
                },
                Err(e) => yield StreamRecord::Error { message: e.to_string() },
            }
        }
    }

    async fn load(&self, input: &TurnInput) -> Result<TurnState, TurnError> {
        Ok(TurnState::load(self.conversations.as_ref(), &input.conversation_id, self.history_limit).await?)
    }

    /// Route the turn. A failed route still persists the slots it changed,
    /// so a draft whose tool was rejected stays discarded.
    async fn route_or_discard(
        &self,
        input: &TurnInput,
        state: &mut TurnState,
        before: &TurnState,
    ) -> Result<Step, TurnError> {
        match self.route(input, state).await {
            Ok(step) => Ok(step),
            Err(e) => {
                warn!(error = %e, "Turn failed");
                state
                    .save_changes(self.conversations.as_ref(), &input.conversation_id, before)
                    .await?;
                Err(e)
            }
        }
    }

    async fn finish(
        &self,
        input: &TurnInput,
        state: &mut TurnState,
        before: &TurnState,
        mut outcome: Outcome,
    ) -> Result<TurnResponse, TurnError> {
        let id = input.conversation_id;
        state.save_changes(self.conversations.as_ref(), &id, before).await?;

        let user = ConversationMessage::new(id, MessageRole::User, input.message.as_str(), None);
        let assistant = ConversationMessage::new(
            id,
            MessageRole::Assistant,
            outcome.message.as_str(),
            Some(outcome.mode.to_string()),
        );
        self.conversations.append_message(&user).await?;
        self.conversations.append_message(&assistant).await?;

        if let Some(site_id) = state.meta.site_id {
            outcome
                .payload
                .entry("siteId")
                .or_insert_with(|| Value::String(site_id.to_string()));
        }
        tracing::Span::current().record("mode", tracing::field::display(outcome.mode));
        info!(mode = %outcome.mode, "Turn completed");

        Ok(TurnResponse {
            conversation_id: id.to_string(),
            mode: outcome.mode,
            user_message: input.message.clone(),
            assistant_message: outcome.message,
            payload: outcome.payload,
        })
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    async fn route(&self, input: &TurnInput, state: &mut TurnState) -> Result<Step, TurnError> {
        let text = input.message.trim();

        if let Some(pending) = state.pending() {
            debug!(?pending, "Resolving pending item");
            return self.resolve_pending(pending, input, state).await;
        }

        if !state.intake.is_complete() {
            let awaiting = state.meta.awaiting == Some(Awaiting::Intake);
            let filled = apply_intake_answers(&mut state.intake, text, awaiting);
            debug!(filled = filled.len(), "Intake answers applied");
            let missing = state.intake.missing_fields();
            if missing.is_empty() {
                state.meta.awaiting = None;
                return Ok(Outcome::new(TurnMode::Clarifier, intake_summary(&state.intake))
                    .with("intake", &state.intake)
                    .into());
            }
            state.meta.awaiting = Some(Awaiting::Intake);
            return Ok(Outcome::new(TurnMode::Clarifier, intake_questions(&missing))
                .with("missingFields", &missing)
                .into());
        }

        if state.intent.is_none() {
            if !apply_intake_answers(&mut state.intake, text, false).is_empty() {
                return Ok(Outcome::new(TurnMode::Clarifier, intake_summary(&state.intake))
                    .with("intake", &state.intake)
                    .into());
            }
            if Reply::classify(text) != Reply::Affirmative {
                return Ok(Outcome::new(TurnMode::Clarifier, intake_summary(&state.intake)).into());
            }
            let intent = derive_intent(&state.intake);
            state.intent = Some(DesignIntentState::proposed(intent));
            return Ok(Outcome::new(TurnMode::DesignIntent, design_intent_message(&intent))
                .with("designIntent", intent)
                .into());
        }

        if let Some(proposed) = state.intent.as_ref().filter(|s| !s.locked).map(|s| s.intent) {
            let choice = DesignChoice::parse(text).or_else(|| {
                (Reply::classify(text) == Reply::Affirmative).then_some(DesignChoice::Keep)
            });
            let Some(choice) = choice else {
                return Ok(Outcome::new(TurnMode::DesignIntent, design_intent_message(&proposed))
                    .with("designIntent", proposed)
                    .into());
            };
            let intent = choice.apply(proposed);
            let theme = theme_for(&intent);
            let site = self
                .tools
                .create_site(
                    input.conversation_id,
                    input.user_id.as_deref(),
                    &site_name(&state.intake),
                    theme,
                )
                .await?;
            if let Some(intent_state) = state.intent.as_mut() {
                intent_state.lock(intent);
            }
            state.meta.site_id = Some(site.id);
            info!(site_id = %site.id, ?choice, %theme, "Design intent locked");
            return Ok(Outcome::new(TurnMode::Ready, ready_message(&intent, theme))
                .with("designIntent", intent)
                .with("theme", theme)
                .into());
        }

        let mut message = text.to_string();
        let mut preface = None;
        if state.meta.awaiting == Some(Awaiting::Voice) {
            apply_voice_answers(&mut state.voice, text);
            let missing = state.voice.missing_fields();
            if !missing.is_empty() {
                return Ok(Outcome::new(TurnMode::Voice, voice_questions(&missing))
                    .with("missingFields", &missing)
                    .into());
            }
            state.meta.awaiting = None;
            match state.meta.deferred_request.take() {
                Some(deferred) => {
                    message = deferred;
                    preface = Some("Thanks, the voice is set. Back to your request.".to_string());
                }
                None => {
                    return Ok(Outcome::new(
                        TurnMode::Voice,
                        "Thanks, the voice is set. Ask me to write any section.",
                    )
                    .with("voice", &state.voice)
                    .into());
                }
            }
        }

        let step = self.dispatch(input, &message, state).await?;
        Ok(step.prefaced(preface))
    }

    async fn dispatch(
        &self,
        input: &TurnInput,
        message: &str,
        state: &mut TurnState,
    ) -> Result<Step, TurnError> {
        let tag = match self.classifier.classify(message) {
            Classification::One(tag) => tag,
            Classification::None => return Ok(Outcome::new(TurnMode::Advisor, help_message()).into()),
            Classification::Ambiguous(tags) => {
                let options: Vec<String> = tags
                    .iter()
                    .enumerate()
                    .map(|(i, t)| format!("{}) {}", i + 1, t.describe()))
                    .collect();
                return Ok(Outcome::new(
                    TurnMode::Advisor,
                    format!(
                        "That could mean more than one thing: {}. Which one should I do first?",
                        options.join(", ")
                    ),
                )
                .into());
            }
        };
        debug!(intent = %tag, "Intent classified");

        if let Some(failure) = check_gates(tag, state) {
            info!(intent = %tag, ?failure, "Gate failed");
            return Ok(gate_prompt(failure, message, state).into());
        }

        match tag {
            IntentTag::Build => {
                let site_id = self.site_id(input, state)?;
                if state.plan.as_ref().is_some_and(|p| p.is_applied()) {
                    self.recommend(site_id, state).await.map(Step::from)
                } else {
                    self.propose_plan(message, state).await.map(Step::from)
                }
            }
            IntentTag::ContentEdit => {
                let site_id = self.site_id(input, state)?;
                let data = self.site_data(&site_id).await?;
                let Some((page, section)) = content_target(&data, input.scope.as_deref(), message) else {
                    return Ok(Outcome::new(
                        TurnMode::Advisor,
                        "I couldn't find that section. Name the page and section, e.g. \"the hero on the about page\".",
                    )
                    .into());
                };
                Ok(Step::Content(self.content_job(page, section.clone(), message, state)))
            }
            IntentTag::Presentation => {
                let site_id = self.site_id(input, state)?;
                self.propose_presentation(site_id, input, message, state).await.map(Step::from)
            }
            IntentTag::Release => {
                if input.user_id.is_none() {
                    return Err(TurnError::Unauthorized(
                        "release operations require a verified user".to_string(),
                    ));
                }
                let site_id = self.site_id(input, state)?;
                self.propose_release(site_id, message, state).await.map(Step::from)
            }
            IntentTag::Audit => {
                let site_id = self.site_id(input, state)?;
                let data = self.site_data(&site_id).await?;
                let view = SiteView {
                    data: &data,
                    intake: &state.intake,
                    voice: &state.voice,
                    intent: state.locked_intent(),
                };
                let run = run_audit(site_id, &view);
                self.insights.save_audit_run(&run).await?;
                info!(site_id = %site_id, findings = run.findings.len(), "Audit run saved");
                Ok(Outcome::new(TurnMode::Audit, format_report(&run))
                    .with("auditRun", &run)
                    .into())
            }
            IntentTag::Recommend => {
                let site_id = self.site_id(input, state)?;
                self.recommend(site_id, state).await.map(Step::from)
            }
            IntentTag::AdvisoryMode => {
                let lower = message.to_lowercase();
                let mode = if lower.contains("proactive") {
                    AdvisoryMode::Proactive
                } else {
                    AdvisoryMode::Quiet
                };
                state.meta.advisory_mode = mode;
                let reply = match mode {
                    AdvisoryMode::Proactive => {
                        "Proactive mode is on. I'll suggest next steps after each change."
                    }
                    AdvisoryMode::Quiet => "Quiet mode is on. I'll only make suggestions when you ask.",
                };
                Ok(Outcome::new(TurnMode::Advisor, reply)
                    .with("advisoryMode", mode)
                    .into())
            }
            IntentTag::Explain => self.explain(message, state).await.map(Step::from),
        }
    }

    // -----------------------------------------------------------------------
    // Pending items
    // -----------------------------------------------------------------------

    async fn resolve_pending(
        &self,
        pending: Pending,
        input: &TurnInput,
        state: &mut TurnState,
    ) -> Result<Step, TurnError> {
        let reply = Reply::classify(&input.message);
        match pending {
            Pending::Plan => self.resolve_plan(reply, input, state).await.map(Step::from),
            Pending::Draft(DraftKind::Recommendation) => {
                self.resolve_recommendation(reply, input, state).await
            }
            Pending::Draft(kind) => self.resolve_draft(kind, reply, input, state).await.map(Step::from),
        }
    }

    async fn resolve_plan(
        &self,
        reply: Reply,
        input: &TurnInput,
        state: &mut TurnState,
    ) -> Result<Outcome, TurnError> {
        let Some(plan_state) = state.plan.clone() else {
            return Err(TurnError::Internal("pending plan vanished".to_string()));
        };
        match reply {
            Reply::Affirmative => {
                let site_id = self.site_id(input, state)?;
                let call = ToolCall::from(StructureTool::CreateSiteFromPlan {
                    plan: plan_state.plan.clone(),
                });
                if let Some(p) = state.plan.as_mut() {
                    p.status = PlanStatus::Discarded;
                }
                let outcome = self.run_tool(&site_id, &call, input, state).await?;
                if let Some(p) = state.plan.as_mut() {
                    p.status = PlanStatus::Applied;
                }
                let result = Outcome::new(
                    TurnMode::Planner,
                    format!(
                        "{}. Ask me to write copy for any section, or for recommendations.",
                        outcome.summary
                    ),
                )
                .with("mutationId", outcome.entry.id)
                .with("plan", &plan_state.plan);
                self.follow_up(site_id, state, result).await
            }
            Reply::Negative => {
                if let Some(p) = state.plan.as_mut() {
                    p.status = PlanStatus::Discarded;
                }
                Ok(Outcome::new(
                    TurnMode::Planner,
                    "Plan discarded. Ask me to build the site again when you want a new one.",
                ))
            }
            Reply::Choice(_) | Reply::Other => Ok(Outcome::new(
                TurnMode::Planner,
                format!(
                    "A site plan is waiting for your answer.\n\n{}",
                    render_plan(&plan_state.plan, &plan_state.rationale)
                ),
            )
            .with("plan", &plan_state.plan)),
        }
    }

    async fn resolve_draft(
        &self,
        kind: DraftKind,
        reply: Reply,
        input: &TurnInput,
        state: &mut TurnState,
    ) -> Result<Outcome, TurnError> {
        let staged: Option<(ToolCall, String, Option<RecommendationChoice>)> = match kind {
            DraftKind::Content => state
                .content_draft
                .as_ref()
                .map(|d| (d.tool.clone().into(), d.rationale.clone(), d.recommendation.clone())),
            DraftKind::Presentation => state
                .presentation_draft
                .as_ref()
                .map(|d| (d.tool.clone().into(), d.rationale.clone(), d.recommendation.clone())),
            DraftKind::Release => state
                .release_draft
                .as_ref()
                .map(|d| (d.tool.clone().into(), d.rationale.clone(), d.recommendation.clone())),
            DraftKind::Recommendation => None,
        };
        let Some((call, rationale, choice)) = staged else {
            return Err(TurnError::Internal(format!("pending {kind} draft vanished")));
        };
        let mode = TurnMode::Draft(kind);

        match reply {
            Reply::Affirmative => {
                clear_draft(kind, state);
                let site_id = self.site_id(input, state)?;
                let outcome = match self.run_tool(&site_id, &call, input, state).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        if let Some(choice) = &choice {
                            self.settle(choice, false).await?;
                        }
                        return Err(e);
                    }
                };
                if let Some(choice) = &choice {
                    self.settle(choice, true).await?;
                }
                let mut result = Outcome::new(mode, format!("Done. {}.", outcome.summary))
                    .with("mutationId", outcome.entry.id);
                if let Some(snapshot) = &outcome.snapshot {
                    result = result.with("snapshot", snapshot);
                }
                self.follow_up(site_id, state, result).await
            }
            Reply::Negative => {
                clear_draft(kind, state);
                if let Some(choice) = &choice {
                    self.settle(choice, false).await?;
                }
                info!(tool = call.name(), "Draft discarded");
                Ok(Outcome::new(mode, "Discarded. Nothing was changed."))
            }
            Reply::Choice(_) | Reply::Other => Ok(Outcome::new(
                mode,
                format!(
                    "A {kind} change is waiting: {rationale}. Reply yes to apply it or no to discard it."
                ),
            )
            .with("tool", call.name())),
        }
    }

    async fn resolve_recommendation(
        &self,
        reply: Reply,
        input: &TurnInput,
        state: &mut TurnState,
    ) -> Result<Step, TurnError> {
        let Some(mut draft) = state.recommendation_draft.clone() else {
            return Err(TurnError::Internal("pending recommendation draft vanished".to_string()));
        };

        // A content choice parked on the voice contract takes this reply as
        // voice answers unless the user backs out.
        let mut reply = reply;
        let mut preface = None;
        if let Some(index) = draft
            .awaiting_voice
            .take()
            .filter(|i| *i < draft.recommendations.len())
        {
            if reply != Reply::Negative {
                apply_voice_answers(&mut state.voice, input.message.trim());
                let missing = state.voice.missing_fields();
                if !missing.is_empty() {
                    return Ok(Outcome::new(TurnMode::Voice, voice_questions(&missing))
                        .with("missingFields", &missing)
                        .with("recommendationId", draft.recommendations[index].id)
                        .into());
                }
                reply = Reply::Choice(index + 1);
                preface = Some("Thanks, the voice is set. Back to your recommendation.".to_string());
            }
            state.recommendation_draft = Some(draft.clone());
        }

        let actionable: Vec<Uuid> = draft.actionable().map(|r| r.id).collect();
        let mode = TurnMode::Draft(DraftKind::Recommendation);
        let reprompt = |lead: &str| {
            Outcome::new(
                mode,
                format!("{lead}\n\n{}", render_recommendations(&draft.recommendations)),
            )
            .with("recommendations", &draft.recommendations)
        };

        let index = match reply {
            Reply::Choice(n) if n <= draft.recommendations.len() => n - 1,
            Reply::Choice(_) => {
                return Ok(reprompt(&format!(
                    "Pick a number between 1 and {}.",
                    draft.recommendations.len()
                ))
                .into());
            }
            Reply::Affirmative => {
                let mut only = draft
                    .recommendations
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.is_actionable());
                match (only.next(), only.next()) {
                    (Some((i, _)), None) => i,
                    _ => return Ok(reprompt("Which one? Reply with its number.").into()),
                }
            }
            Reply::Negative => {
                state.recommendation_draft = None;
                self.set_statuses(&actionable, RecommendationStatus::Rejected).await?;
                return Ok(Outcome::new(
                    TurnMode::Advisor,
                    "Understood. I won't suggest those again.",
                )
                .into());
            }
            Reply::Other => {
                return Ok(reprompt("A set of recommendations is waiting for your choice.").into());
            }
        };

        let chosen = draft.recommendations[index].clone();

        if !chosen.is_actionable() {
            state.recommendation_draft = None;
            self.set_statuses(&actionable, RecommendationStatus::Deferred).await?;
            return Ok(Outcome::new(
                TurnMode::Advisor,
                format!("{}. I'll keep the other ideas for later.", chosen.title),
            )
            .into());
        }

        let choice = RecommendationChoice {
            chosen: chosen.id,
            others: actionable.into_iter().filter(|id| *id != chosen.id).collect(),
        };
        let site_id = self.site_id(input, state)?;

        if let Some(action) = &chosen.action {
            state.recommendation_draft = None;
            let outcome = match self.run_tool(&site_id, action, input, state).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.settle(&choice, false).await?;
                    return Err(e);
                }
            };
            self.settle(&choice, true).await?;
            let result = Outcome::new(mode, format!("Done: {}. {}.", chosen.title, outcome.summary))
                .with("mutationId", outcome.entry.id)
                .with("recommendationId", chosen.id);
            return self
                .follow_up(site_id, state, result)
                .await
                .map(|outcome| Step::from(outcome).prefaced(preface));
        }

        // Copy for the chosen section still needs the voice contract.
        match check_gates(IntentTag::ContentEdit, state) {
            None => {}
            Some(GateFailure::VoiceIncomplete) => {
                let missing = state.voice.missing_fields();
                state.recommendation_draft = Some(RecommendationDraft {
                    awaiting_voice: Some(index),
                    ..draft
                });
                info!(recommendation_id = %chosen.id, "Recommendation waiting on voice contract");
                return Ok(Outcome::new(TurnMode::Voice, voice_questions(&missing))
                    .with("missingFields", &missing)
                    .with("recommendationId", chosen.id)
                    .into());
            }
            Some(failure) => {
                state.recommendation_draft = None;
                self.settle(&choice, false).await?;
                return Ok(gate_prompt(failure, &input.message, state).into());
            }
        }
        state.recommendation_draft = None;

        let data = self.site_data(&site_id).await?;
        let target = chosen
            .focus_section
            .and_then(|id| data.find_section(id))
            .map(|(page, section)| (page, section.clone()));
        let Some((page, section)) = target else {
            self.settle(&choice, false).await?;
            return Err(TurnError::Precondition(
                "the section this recommendation was about no longer exists".to_string(),
            ));
        };
        let mut job = self.content_job(page, section, &chosen.title, state);
        job.recommendation = Some(choice);
        Ok(Step::Content(job).prefaced(preface))
    }

    // -----------------------------------------------------------------------
    // Proposals
    // -----------------------------------------------------------------------

    async fn propose_plan(&self, message: &str, state: &mut TurnState) -> Result<Outcome, TurnError> {
        let Some(intent) = state.locked_intent().copied() else {
            return Ok(gate_prompt(GateFailure::IntentUnlocked, message, state));
        };
        let prompt = prompts::plan_prompt(&state.intake, &intent, &state.history, message);
        let intake = state.intake.clone();
        match self
            .generative
            .generate(prompt, |raw| prompts::check_plan_reply(raw, &intake))
            .await
        {
            Ok((plan, rationale)) => {
                info!(pages = plan.page_count(), sections = plan.section_count(), "Site plan proposed");
                let text = render_plan(&plan, &rationale);
                let result = Outcome::new(TurnMode::Planner, text).with("plan", &plan);
                state.plan = Some(SitePlanState::proposed(plan, rationale));
                Ok(result)
            }
            Err(GenerationError::Unsatisfied(violations)) => Ok(Outcome::unable("a site plan", violations)),
            Err(GenerationError::Llm(e)) => Err(e.into()),
        }
    }

    fn content_job(
        &self,
        page: PageKind,
        section: Section,
        instruction: &str,
        state: &TurnState,
    ) -> ContentJob {
        let prompt = prompts::content_prompt(
            &state.intake,
            &state.voice,
            page,
            &section,
            &state.history,
            instruction,
        );
        ContentJob {
            page,
            section,
            prompt,
            preface: None,
            recommendation: None,
        }
    }

    async fn conclude_content(
        &self,
        job: ContentJob,
        result: Result<Value, GenerationError>,
        state: &mut TurnState,
    ) -> Result<Outcome, TurnError> {
        let content = match result {
            Ok(content) => content,
            Err(GenerationError::Unsatisfied(violations)) => {
                if let Some(choice) = &job.recommendation {
                    self.settle(choice, false).await?;
                }
                return Ok(Outcome::unable("copy", violations));
            }
            Err(GenerationError::Llm(e)) => return Err(e.into()),
        };

        let section_id = job.section.id;
        let tool = if job.section.content.is_some() {
            ContentTool::RewriteSectionContent { section_id, content: content.clone() }
        } else {
            ContentTool::GenerateSectionContent { section_id, content: content.clone() }
        };
        let rationale = format!(
            "new copy for the {} section on the {} page, in {}",
            job.section.section_type,
            job.page,
            voice_phrase(&state.voice)
        );
        let draft = Draft::new(tool, rationale).with_recommendation(job.recommendation);
        let pretty = serde_json::to_string_pretty(&content).unwrap_or_else(|_| content.to_string());
        let mut text = format!(
            "Here is {}:\n{pretty}\n\nApply it? (yes / no)",
            draft.rationale
        );
        if let Some(preface) = &job.preface {
            text = format!("{preface}\n\n{text}");
        }
        let outcome = Outcome::new(TurnMode::Draft(DraftKind::Content), text).with("draft", &draft);
        info!(section_id = %section_id, "Content draft staged");
        state.content_draft = Some(draft);
        Ok(outcome)
    }

    async fn propose_presentation(
        &self,
        site_id: SiteId,
        input: &TurnInput,
        message: &str,
        state: &mut TurnState,
    ) -> Result<Outcome, TurnError> {
        let data = self.site_data(&site_id).await?;
        let Some(tool) = presentation_proposal(&data, state.locked_intent(), input.scope.as_deref(), message)
        else {
            return Ok(Outcome::new(
                TurnMode::Advisor,
                "Tell me which theme (classic, modern, bold, calm, luxe) or which section layout to change.",
            ));
        };
        if let PresentationTool::ApplyTheme { theme } = &tool {
            if *theme == data.theme {
                return Ok(Outcome::new(
                    TurnMode::Advisor,
                    format!("The site already uses the {theme} theme."),
                ));
            }
        }
        let rationale = describe_presentation(&tool, &data);
        let draft = Draft::new(tool, rationale);
        let text = format!("I'd {}. Apply it? (yes / no)", draft.rationale);
        let outcome = Outcome::new(TurnMode::Draft(DraftKind::Presentation), text).with("draft", &draft);
        state.presentation_draft = Some(draft);
        Ok(outcome)
    }

    async fn propose_release(
        &self,
        site_id: SiteId,
        message: &str,
        state: &mut TurnState,
    ) -> Result<Outcome, TurnError> {
        let Some(request) = parse_release(message) else {
            return Ok(Outcome::new(
                TurnMode::Advisor,
                "I can create a preview, publish a preview, or roll back to an earlier release.",
            ));
        };
        let site = self
            .sites
            .get_site(&site_id)
            .await?
            .ok_or_else(|| TurnError::NotFound(format!("site {site_id}")))?;

        let tool = match request {
            ReleaseRequest::Preview { label } => ReleaseTool::CreatePreview {
                label: label.unwrap_or_else(|| format!("Preview {}", Utc::now().format("%Y-%m-%d %H:%M"))),
            },
            ReleaseRequest::Publish { snapshot_id } => {
                let snapshot_id = match snapshot_id {
                    Some(id) => self.site_snapshot(&site_id, id).await?.id,
                    None => self
                        .sites
                        .list_snapshots(&site_id)
                        .await?
                        .into_iter()
                        .find(|s| s.state == SnapshotState::Preview)
                        .map(|s| s.id)
                        .ok_or_else(|| {
                            TurnError::Precondition(
                                "there is no preview to publish yet; ask me to create one first".to_string(),
                            )
                        })?,
                };
                ReleaseTool::PublishSnapshot { snapshot_id }
            }
            ReleaseRequest::Rollback { snapshot_id } => {
                let target = match snapshot_id {
                    Some(id) => self.site_snapshot(&site_id, id).await?,
                    None => self
                        .sites
                        .list_snapshots(&site_id)
                        .await?
                        .into_iter()
                        .find(|s| {
                            s.state == SnapshotState::Published
                                && Some(s.id) != site.current_published_snapshot_id
                        })
                        .ok_or_else(|| {
                            TurnError::Precondition(
                                "there is no earlier published release to roll back to".to_string(),
                            )
                        })?,
                };
                if site.current_published_snapshot_id == Some(target.id) {
                    return Err(TurnError::Precondition(format!(
                        "snapshot {} is already live",
                        target.id
                    )));
                }
                if target.state != SnapshotState::Published {
                    return Err(TurnError::Precondition(format!(
                        "snapshot {} was never published",
                        target.id
                    )));
                }
                ReleaseTool::RollbackToSnapshot { snapshot_id: target.id }
            }
        };

        let rationale = describe_release(&tool);
        let draft = Draft::new(tool, rationale);
        let text = format!("I'll {}. Go ahead? (yes / no)", draft.rationale);
        let outcome = Outcome::new(TurnMode::Draft(DraftKind::Release), text).with("draft", &draft);
        state.release_draft = Some(draft);
        Ok(outcome)
    }

    async fn explain(&self, message: &str, state: &TurnState) -> Result<Outcome, TurnError> {
        let data = match state.meta.site_id {
            Some(id) => self.sites.load_data(&id).await?,
            None => None,
        };
        let prompt = prompts::explain_prompt(&state.intake, data.as_ref(), &state.history, message);
        match self.generative.generate(prompt, prompts::check_answer).await {
            Ok(answer) => Ok(Outcome::new(TurnMode::Advisor, answer)),
            Err(GenerationError::Unsatisfied(violations)) => Ok(Outcome::unable("an answer", violations)),
            Err(GenerationError::Llm(e)) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Recommendations
    // -----------------------------------------------------------------------

    /// Rank recommendations and stage them as a draft. Only actionable ones
    /// are recorded; "leave as is" lives in the draft alone.
    async fn stage_recommendations(
        &self,
        site_id: SiteId,
        state: &mut TurnState,
    ) -> Result<Option<Vec<Recommendation>>, TurnError> {
        let data = self.site_data(&site_id).await?;
        let records = self.insights.list_recommendations(&site_id).await?;
        let history = key_history(&records);
        let view = SiteView {
            data: &data,
            intake: &state.intake,
            voice: &state.voice,
            intent: state.locked_intent(),
        };
        let recommendations = self.recommender.recommend(&view, &history);
        if !recommendations.iter().any(Recommendation::is_actionable) {
            return Ok(None);
        }

        let now = Utc::now();
        let records: Vec<RecommendationRecord> = recommendations
            .iter()
            .filter(|r| r.is_actionable())
            .map(|r| RecommendationRecord {
                site_id,
                recommendation: r.clone(),
                status: RecommendationStatus::Proposed,
                created_at: now,
                updated_at: now,
            })
            .collect();
        self.insights.save_recommendations(&records).await?;
        info!(site_id = %site_id, count = records.len(), "Recommendations staged");

        state.recommendation_draft = Some(RecommendationDraft::new(
            recommendations.clone(),
            "ranked by impact, fit with your goals, confidence and disruption",
        ));
        Ok(Some(recommendations))
    }

    async fn recommend(&self, site_id: SiteId, state: &mut TurnState) -> Result<Outcome, TurnError> {
        match self.stage_recommendations(site_id, state).await? {
            Some(recommendations) => Ok(Outcome::new(
                TurnMode::Draft(DraftKind::Recommendation),
                render_recommendations(&recommendations),
            )
            .with("recommendations", &recommendations)),
            None => Ok(Outcome::new(
                TurnMode::Advisor,
                "Nothing stands out right now. The site covers the basics for its goal.",
            )),
        }
    }

    /// In proactive mode, stage fresh recommendations after a change lands.
    async fn follow_up(
        &self,
        site_id: SiteId,
        state: &mut TurnState,
        outcome: Outcome,
    ) -> Result<Outcome, TurnError> {
        if state.meta.advisory_mode != AdvisoryMode::Proactive || state.pending().is_some() {
            return Ok(outcome);
        }
        let Some(recommendations) = self.stage_recommendations(site_id, state).await? else {
            return Ok(outcome);
        };
        let mut outcome = outcome;
        outcome.mode = TurnMode::Draft(DraftKind::Recommendation);
        outcome.message = format!(
            "{}\n\n{}",
            outcome.message,
            render_recommendations(&recommendations)
        );
        Ok(outcome.with("recommendations", &recommendations))
    }

    async fn set_statuses(&self, ids: &[Uuid], status: RecommendationStatus) -> Result<(), TurnError> {
        for id in ids {
            self.insights.set_recommendation_status(id, status).await?;
        }
        Ok(())
    }

    /// Record the outcome of a choice. When the chosen change did not land,
    /// every option is deferred so it can come back later.
    async fn settle(&self, choice: &RecommendationChoice, landed: bool) -> Result<(), TurnError> {
        let chosen_status = if landed {
            RecommendationStatus::Accepted
        } else {
            RecommendationStatus::Deferred
        };
        self.insights
            .set_recommendation_status(&choice.chosen, chosen_status)
            .await?;
        self.set_statuses(&choice.others, RecommendationStatus::Deferred).await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn run_tool(
        &self,
        site_id: &SiteId,
        call: &ToolCall,
        input: &TurnInput,
        state: &TurnState,
    ) -> Result<ToolOutcome, TurnError> {
        let ctx = ToolContext {
            user_id: input.user_id.as_deref(),
            intake: &state.intake,
        };
        Ok(self.tools.execute(site_id, call, ctx).await?)
    }

    /// The conversation's site. A request naming a different site is refused.
    fn site_id(&self, input: &TurnInput, state: &TurnState) -> Result<SiteId, TurnError> {
        match (state.meta.site_id, input.site_id) {
            (Some(own), Some(requested)) if own != requested => Err(TurnError::NotFound(format!(
                "site {requested} in this conversation"
            ))),
            (Some(id), _) | (None, Some(id)) => Ok(id),
            (None, None) => Err(TurnError::NotFound(
                "no site exists for this conversation yet".to_string(),
            )),
        }
    }

    async fn site_data(&self, site_id: &SiteId) -> Result<SiteData, TurnError> {
        self.sites
            .load_data(site_id)
            .await?
            .ok_or_else(|| TurnError::NotFound(format!("site {site_id}")))
    }

    async fn site_snapshot(
        &self,
        site_id: &SiteId,
        id: Uuid,
    ) -> Result<Snapshot, TurnError> {
        match self.sites.get_snapshot(&id).await? {
            Some(snapshot) if snapshot.site_id == *site_id => Ok(snapshot),
            _ => Err(TurnError::NotFound(format!("snapshot {id}"))),
        }
    }
}

fn clear_draft(kind: DraftKind, state: &mut TurnState) {
    match kind {
        DraftKind::Content => state.content_draft = None,
        DraftKind::Presentation => state.presentation_draft = None,
        DraftKind::Release => state.release_draft = None,
        DraftKind::Recommendation => state.recommendation_draft = None,
    }
}

fn voice_phrase(voice: &VoiceContract) -> String {
    match (voice.tone, voice.verbosity) {
        (Some(tone), Some(verbosity)) => format!("a {tone}, {verbosity} voice"),
        (Some(tone), None) => format!("a {tone} voice"),
        _ => "your voice".to_string(),
    }
}

fn help_message() -> String {
    let mut text = String::from("I can help you:");
    for tag in IntentTag::ALL {
        text.push_str(&format!("\n- {}", tag.describe()));
    }
    text
}

/// The clarifying prompt that replaces a gated intent.
fn gate_prompt(failure: GateFailure, message: &str, state: &mut TurnState) -> Outcome {
    match failure {
        GateFailure::IntakeIncomplete => {
            let missing = state.intake.missing_fields();
            state.meta.awaiting = Some(Awaiting::Intake);
            Outcome::new(TurnMode::Clarifier, intake_questions(&missing)).with("missingFields", &missing)
        }
        GateFailure::IntentUnlocked => match &state.intent {
            Some(s) => Outcome::new(TurnMode::DesignIntent, design_intent_message(&s.intent))
                .with("designIntent", s.intent),
            None => Outcome::new(TurnMode::Clarifier, intake_summary(&state.intake)),
        },
        GateFailure::VoiceIncomplete => {
            let missing = state.voice.missing_fields();
            state.meta.awaiting = Some(Awaiting::Voice);
            state.meta.deferred_request = Some(message.to_string());
            Outcome::new(TurnMode::Voice, voice_questions(&missing)).with("missingFields", &missing)
        }
        GateFailure::NoPlan => Outcome::new(
            TurnMode::Planner,
            "There is no site plan yet. Ask me to build the site and I'll propose one.",
        ),
    }
}

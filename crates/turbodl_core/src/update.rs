use crate::{
    AnalysisState, AppState, Effect, EventClass, JobKind, JobRequest, LinkState, LogSource, Msg,
    ProgressEvent,
};

const NOTIFY_TITLE: &str = "Task Complete";
const NOTIFY_BODY: &str = "Your operation is finished.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::AnalyzeRequested { url } => request_analysis(&mut state, url),
        Msg::AnalysisFinished(result) => {
            finish_analysis(&mut state, result);
            Vec::new()
        }
        Msg::SubmitJob(request) => submit_job(&mut state, request),
        Msg::CommandAccepted { .. } => Vec::new(),
        Msg::CommandFailed { kind, error } => {
            revert_submission(&mut state, kind, &error);
            Vec::new()
        }
        Msg::Connecting { .. } => {
            state.set_link(LinkState::Connecting);
            Vec::new()
        }
        Msg::Connected => {
            state.set_link(LinkState::Open);
            state.append_log(LogSource::System, "Connected to backend.");
            Vec::new()
        }
        Msg::ConnectionLost { retry_in } => {
            state.set_link(LinkState::Reconnecting);
            state.append_log(
                LogSource::System,
                format!(
                    "Connection lost. Reconnecting in {}s...",
                    retry_in.as_secs_f64()
                ),
            );
            // Progress for the previous job may never arrive on the new connection.
            if !state.release_slot().is_vacant() {
                state.append_log(LogSource::System, "Job state reset after connection loss.");
            }
            Vec::new()
        }
        Msg::Progress(event) => apply_progress(&mut state, event),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn request_analysis(state: &mut AppState, url: String) -> Vec<Effect> {
    let url = url.trim().to_string();
    if url.is_empty() {
        return Vec::new();
    }
    if let AnalysisState::Scanning { url: pending } = state.analysis() {
        let message = format!("Still scanning {pending}; analysis request ignored.");
        state.append_log(LogSource::Info, message);
        return Vec::new();
    }

    state.append_log(LogSource::Analysis, format!("Scanning URL: {url}"));
    state.set_analysis(AnalysisState::Scanning { url: url.clone() });
    vec![Effect::Analyze { url }]
}

fn finish_analysis(state: &mut AppState, result: Result<Vec<crate::VideoInfo>, String>) {
    match result {
        Ok(videos) if videos.is_empty() => {
            state.append_log(LogSource::Analysis, "No videos found.");
            state.set_analysis(AnalysisState::Ready { videos });
        }
        Ok(videos) => {
            state.append_log(
                LogSource::Analysis,
                format!("Found {} videos.", videos.len()),
            );
            state.set_analysis(AnalysisState::Ready { videos });
        }
        Err(error) => {
            state.append_log(LogSource::Error, format!("Analysis failed: {error}"));
            state.set_analysis(AnalysisState::Idle);
        }
    }
}

/// Client-side gate: at most one job occupies the slot. A second submission
/// is refused outright, without reaching the backend.
fn submit_job(state: &mut AppState, request: JobRequest) -> Vec<Effect> {
    let kind = request.kind();
    if !state.slot().is_vacant() {
        state.append_log(
            LogSource::Error,
            format!("{kind} refused: another job is running."),
        );
        return Vec::new();
    }

    state.reserve_slot(kind);
    state.append_log(kind.log_source(), request.narrative());
    vec![Effect::IssueCommand(request)]
}

fn revert_submission(state: &mut AppState, kind: JobKind, error: &str) {
    // Only our own provisional write is undone; a slot that progress has
    // already claimed stays as the backend reported it.
    if matches!(state.slot(), crate::JobSlot::Submitting { kind: pending } if *pending == kind) {
        state.release_slot();
    }
    state.append_log(LogSource::Error, format!("{kind} request failed: {error}"));
}

fn apply_progress(state: &mut AppState, event: ProgressEvent) -> Vec<Effect> {
    match event.classify() {
        EventClass::Busy => {
            state.enter_busy(event);
            Vec::new()
        }
        EventClass::Completed => {
            state.release_slot();
            state.append_log(LogSource::Success, event.completion_text());
            state.record_notification();
            vec![Effect::Notify {
                title: NOTIFY_TITLE.to_string(),
                body: NOTIFY_BODY.to_string(),
            }]
        }
        EventClass::Failed => {
            state.release_slot();
            state.append_log(LogSource::Error, event.error_text());
            Vec::new()
        }
        EventClass::Informational => {
            if let Some(message) = event.message {
                state.append_log(LogSource::Info, message);
            }
            Vec::new()
        }
        EventClass::Ignored => Vec::new(),
    }
}

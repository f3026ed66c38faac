use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use engine_logging::engine_info;
use turbodl_core::{update, AppState, JobRequest, LinkState, Msg, Phase, VideoInfo};

use super::command::{parse_command, Command, HELP};
use super::config::ClientConfig;
use super::effects::{EffectRunner, TerminalNotifier};

const TICK: Duration = Duration::from_millis(75);

pub fn run_app(config: ClientConfig) -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(config.engine_config(), msg_tx, Box::new(TerminalNotifier))
        .context("failed to start the backend engine")?;
    let lines = spawn_stdin_reader();

    println!("TurboDL client, backend {}. Type 'help' for commands.", config.backend_url);
    let mut session = Session::new(runner);

    loop {
        loop {
            match lines.try_recv() {
                Ok(line) => {
                    if session.handle_line(&line) == Flow::Quit {
                        return session.finish();
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return session.finish(),
            }
        }

        match msg_rx.recv_timeout(TICK) {
            Ok(msg) => session.dispatch(msg),
            Err(mpsc::RecvTimeoutError::Timeout) => session.dispatch(Msg::Tick),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                anyhow::bail!("engine event stream closed unexpectedly")
            }
        }
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl Session {
    fn new(runner: EffectRunner) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::default(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.runner.enqueue(effects);
        if was_dirty {
            print_lines(self.renderer.render(&self.state));
        }
    }

    fn submit(&mut self, request: JobRequest) {
        self.dispatch(Msg::SubmitJob(request));
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        match parse_command(line) {
            Ok(Some(command)) => self.handle_command(command),
            Ok(None) => Flow::Continue,
            Err(err) => {
                println!("error: {err}");
                Flow::Continue
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Analyze { url } => self.dispatch(Msg::AnalyzeRequested { url }),
            Command::Download { video, format } => {
                match pick_download(self.state.videos(), video, format) {
                    Ok(request) => self.dispatch(Msg::SubmitJob(request)),
                    Err(problem) => println!("error: {problem}"),
                }
            }
            Command::Images { url } => self.submit(JobRequest::ScrapeImages { url }),
            Command::Scripts { url } => self.submit(JobRequest::ScrapeScripts { url }),
            Command::Clip { url } => self.submit(JobRequest::DownloadClip { url }),
            Command::Convert { path, quality } => self.submit(JobRequest::Convert {
                file_path: path,
                quality,
            }),
            Command::Status => println!("{}", describe_status(&self.state)),
            Command::Log => {
                for entry in self.state.log().snapshot() {
                    println!("{entry}");
                }
            }
            Command::Videos => print_lines(list_videos(self.state.videos())),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn finish(self) -> anyhow::Result<()> {
        engine_info!("Client exiting");
        self.runner.shutdown();
        Ok(())
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

/// Tracks what has already been written so each render prints only news.
#[derive(Debug, Default)]
struct Renderer {
    printed: usize,
    last_progress: Option<String>,
}

impl Renderer {
    fn render(&mut self, state: &AppState) -> Vec<String> {
        let mut out: Vec<String> = state
            .log()
            .since(self.printed)
            .iter()
            .map(|entry| entry.to_string())
            .collect();
        self.printed = state.log().len();

        let progress = state.view().progress.map(|view| view.line());
        if progress != self.last_progress {
            if let Some(line) = &progress {
                out.push(format!("  > {line}"));
            }
            self.last_progress = progress;
        }
        out
    }
}

fn pick_download(
    videos: &[VideoInfo],
    video: usize,
    format: usize,
) -> Result<JobRequest, String> {
    let Some(info) = videos.get(video) else {
        return Err(if videos.is_empty() {
            "no analyzed videos; run 'analyze <url>' first".to_string()
        } else {
            format!("no video #{} (1..={})", video + 1, videos.len())
        });
    };
    if format >= info.formats.len() {
        return Err(format!(
            "video #{} has no format #{} ({} available)",
            video + 1,
            format + 1,
            info.formats.len()
        ));
    }
    Ok(JobRequest::Download {
        video: info.clone(),
        format_index: format,
    })
}

fn describe_status(state: &AppState) -> String {
    let view = state.view();
    let link = match view.link {
        LinkState::Connecting => "connecting",
        LinkState::Open => "connected",
        LinkState::Reconnecting => "reconnecting",
    };
    let job = match (view.phase, view.job_kind) {
        (Phase::Idle, _) => "idle".to_string(),
        (Phase::Submitting, Some(kind)) => format!("submitting {kind}"),
        (Phase::Busy, Some(kind)) => format!("{kind} running"),
        (_, None) => "busy".to_string(),
    };
    let mut status = format!("link: {link} | job: {job}");
    if let Some(progress) = view.progress {
        status.push_str(&format!(" | {}", progress.line()));
    }
    if view.scanning {
        status.push_str(" | analysis in progress");
    }
    status
}

fn list_videos(videos: &[VideoInfo]) -> Vec<String> {
    if videos.is_empty() {
        return vec!["No analyzed videos.".to_string()];
    }
    let mut lines = Vec::new();
    for (i, video) in videos.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, video.title));
        for (j, format) in video.formats.iter().enumerate() {
            lines.push(format!("   {}) {}", j + 1, format));
        }
    }
    lines
}

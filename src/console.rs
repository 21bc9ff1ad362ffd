//! Line-oriented terminal front end for the namespace browser.
//!
//! The loop multiplexes two event sources with `tokio::select!`: commands read
//! from the input and bucket listings arriving from spawned fetch tasks. Only
//! one fetch is kept alive at a time; starting another aborts the previous
//! task, and the session's ticket check discards anything that slips through.
//!
//! Navigation commands (`ls`, `cd`, `select`, `crumb`, `back`) typed while a
//! bucket is still loading are held back and replayed once it arrives.

use crate::browser::{
    BrowserSession, BrowserView, IgnoredReason, LoadOutcome, LoadState, LoadTicket, Transition,
    ViewStatus,
};
use crate::services::key_lister::{KeyLister, ListError, ListResult};
use anyhow::Result;
use futures::FutureExt;
use std::collections::VecDeque;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const HELP: &str = "\
commands:
  buckets           list buckets
  open <bucket>     browse a bucket from its root
  ls                show the current folder
  cd <folder>       enter a folder (`cd ..` goes up)
  select <name>     select an object in the current folder
  back              up one folder; at the root, close the bucket
  crumb <n>         jump to breadcrumb number n
  retry             fetch the current bucket again
  help              this text
  quit              leave";

type Loaded = (LoadTicket, ListResult<Vec<String>>);

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Console<W> {
    session: BrowserSession,
    lister: Arc<dyn KeyLister>,
    out: W,
    loaded_tx: mpsc::UnboundedSender<Loaded>,
    in_flight: Option<JoinHandle<()>>,
    backlog: VecDeque<String>,
}

/// Run the browser until `quit` or end of input. A load still in flight at
/// end of input is awaited so its result is shown.
pub async fn run<R, W>(
    lister: Arc<dyn KeyLister>,
    initial_bucket: Option<String>,
    input: R,
    out: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (loaded_tx, mut loaded_rx) = mpsc::unbounded_channel();
    let mut console = Console {
        session: BrowserSession::new(),
        lister,
        out,
        loaded_tx,
        in_flight: None,
        backlog: VecDeque::new(),
    };

    match initial_bucket {
        Some(bucket) => console.open(&bucket)?,
        None => writeln!(console.out, "type `help` for commands")?,
    }

    let mut lines = input.lines();
    let mut input_open = true;
    loop {
        if !input_open && !console.loading() {
            break;
        }
        tokio::select! {
            line = lines.next_line(), if input_open => match line? {
                Some(line) => {
                    if console.handle(line).await? == Flow::Quit {
                        break;
                    }
                }
                None => input_open = false,
            },
            Some((ticket, result)) = loaded_rx.recv() => {
                if console.finish_load(ticket, result).await? == Flow::Quit {
                    break;
                }
            }
        }
    }

    console.abort_in_flight();
    console.out.flush()?;
    Ok(())
}

impl<W: Write> Console<W> {
    fn loading(&self) -> bool {
        *self.session.load_state() == LoadState::Loading
    }

    async fn handle(&mut self, line: String) -> Result<Flow> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Flow::Continue);
        }
        let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (trimmed, ""),
        };

        if self.loading() && matches!(cmd, "ls" | "cd" | "select" | "crumb" | "back") {
            debug!(command = %trimmed, "deferring until listing arrives");
            self.backlog.push_back(line);
            return Ok(Flow::Continue);
        }

        match cmd {
            "help" => writeln!(self.out, "{}", HELP)?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "buckets" => self.show_buckets().await?,
            "open" if !arg.is_empty() => self.open(arg)?,
            "ls" => self.render()?,
            "retry" => match self.session.retry() {
                Some(ticket) => self.start_load(ticket)?,
                None => writeln!(self.out, "no bucket open")?,
            },
            "back" => {
                let transition = self.session.go_back();
                self.after(transition).await?;
            }
            "cd" if arg == ".." => {
                let transition = self.session.go_back();
                self.after(transition).await?;
            }
            "cd" if !arg.is_empty() => {
                let folder = if arg.ends_with('/') {
                    arg.to_string()
                } else {
                    format!("{}/", arg)
                };
                let transition = self.session.drill_into(&folder);
                self.after(transition).await?;
            }
            "select" if !arg.is_empty() => {
                let transition = self.session.select_leaf(arg);
                self.after(transition).await?;
            }
            "crumb" => match self.crumb_target(arg) {
                Some(target) => {
                    let transition = self.session.jump_to_breadcrumb(&target);
                    self.after(transition).await?;
                }
                None => writeln!(self.out, "no breadcrumb `{}`", arg)?,
            },
            _ => writeln!(self.out, "unknown command `{}` (try `help`)", trimmed)?,
        }
        Ok(Flow::Continue)
    }

    fn crumb_target(&self, arg: &str) -> Option<String> {
        let index: usize = arg.parse().ok()?;
        self.session
            .view()
            .breadcrumbs
            .get(index)
            .map(|crumb| crumb.target_prefix.clone())
    }

    fn open(&mut self, bucket: &str) -> Result<()> {
        self.backlog.clear();
        let ticket = self.session.open_bucket(bucket);
        self.start_load(ticket)
    }

    fn start_load(&mut self, ticket: LoadTicket) -> Result<()> {
        self.abort_in_flight();
        let lister = Arc::clone(&self.lister);
        let tx = self.loaded_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            // A panicking lister must still settle the load, or the session
            // would wait in `Loading` forever.
            let result = AssertUnwindSafe(lister.list_keys(ticket.bucket()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(ListError::Transport("listing task panicked".to_string()))
                });
            // The receiver only goes away when the console shuts down.
            let _ = tx.send((ticket, result));
        }));
        self.render()
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    async fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: ListResult<Vec<String>>,
    ) -> Result<Flow> {
        if self.session.complete_load(ticket, result) == LoadOutcome::Stale {
            return Ok(Flow::Continue);
        }
        self.in_flight = None;
        self.render()?;

        while !self.loading() {
            let Some(line) = self.backlog.pop_front() else {
                break;
            };
            if self.handle(line).await? == Flow::Quit {
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    async fn after(&mut self, transition: Transition) -> Result<()> {
        match transition {
            Transition::Moved => self.render()?,
            Transition::Ignored(reason) => writeln!(self.out, "{}", describe(&reason))?,
            Transition::ExitBrowser => {
                self.abort_in_flight();
                self.session.close();
                self.show_buckets().await?;
            }
        }
        Ok(())
    }

    async fn show_buckets(&mut self) -> Result<()> {
        match self.lister.list_buckets().await {
            Ok(buckets) if buckets.is_empty() => writeln!(self.out, "no buckets")?,
            Ok(buckets) => {
                writeln!(self.out, "buckets:")?;
                for bucket in buckets {
                    writeln!(self.out, "  {}", bucket)?;
                }
            }
            Err(err) => writeln!(self.out, "error: {}", err)?,
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let text = render_view(&self.session.view());
        write!(self.out, "{}", text)?;
        Ok(())
    }
}

fn describe(reason: &IgnoredReason) -> String {
    match reason {
        IgnoredReason::NotAFolder(name) => format!("`{}` is not a folder here", name),
        IgnoredReason::NotALeaf(name) => format!("`{}` is not an object here", name),
        IgnoredReason::NotABreadcrumb(target) => {
            format!("`{}` is not on the breadcrumb trail", target)
        }
        IgnoredReason::NotLoaded => "no listing loaded".to_string(),
    }
}

/// Plain-text rendering of a view.
pub fn render_view(view: &BrowserView) -> String {
    let bucket = view.bucket.as_deref().unwrap_or_default();
    match view.status {
        ViewStatus::Idle => "no bucket open (try `buckets` or `open <bucket>`)\n".to_string(),
        ViewStatus::Loading => format!("loading {}...\n", bucket),
        ViewStatus::Error => format!(
            "error loading {}: {} (type `retry`)\n",
            bucket,
            view.error.as_deref().unwrap_or("unknown error")
        ),
        ViewStatus::Ready => {
            let trail = view
                .breadcrumbs
                .iter()
                .enumerate()
                .map(|(i, crumb)| format!("[{}] {}", i, crumb.label))
                .collect::<Vec<_>>()
                .join(" > ");
            let mut text = format!("{}\n", trail);
            if view.entries.is_empty() {
                text.push_str("  (empty)\n");
            }
            for entry in &view.entries {
                let full = format!("{}{}", view.current_prefix, entry.name);
                let marker = if view.selected_leaf.as_deref() == Some(full.as_str()) {
                    '*'
                } else {
                    ' '
                };
                let kind = if entry.is_folder { 'd' } else { '-' };
                text.push_str(&format!("{} {} {}\n", marker, kind, entry.name));
            }
            if let Some(leaf) = &view.selected_leaf {
                text.push_str(&format!("selected: {}\n", leaf));
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeLister {
        buckets: HashMap<String, (Duration, ListResult<Vec<String>>)>,
    }

    impl FakeLister {
        fn with(mut self, bucket: &str, delay_ms: u64, result: ListResult<Vec<&str>>) -> Self {
            let result = result.map(|keys| keys.into_iter().map(String::from).collect());
            self.buckets
                .insert(bucket.to_string(), (Duration::from_millis(delay_ms), result));
            self
        }
    }

    #[async_trait]
    impl KeyLister for FakeLister {
        async fn list_buckets(&self) -> ListResult<Vec<String>> {
            let mut names: Vec<String> = self.buckets.keys().cloned().collect();
            names.sort();
            Ok(names)
        }

        async fn list_keys(&self, bucket: &str) -> ListResult<Vec<String>> {
            let Some((delay, result)) = self.buckets.get(bucket) else {
                return Err(ListError::Status {
                    status: 404,
                    message: format!("bucket `{}` not found", bucket),
                });
            };
            tokio::time::sleep(*delay).await;
            result.clone()
        }
    }

    fn media() -> FakeLister {
        FakeLister::default().with(
            "media",
            5,
            Ok(vec![
                "logs/2024/a.txt",
                "logs/2024/b.txt",
                "logs/readme.md",
                "photo.png",
            ]),
        )
    }

    async fn transcript(lister: FakeLister, initial: Option<&str>, input: &str) -> String {
        let mut out = Vec::new();
        run(
            Arc::new(lister),
            initial.map(String::from),
            input.as_bytes(),
            &mut out,
        )
        .await
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn drill_select_and_back() {
        let out = transcript(
            media(),
            Some("media"),
            "select photo.png\ncd logs\ncd 2024/\nback\n",
        )
        .await;

        assert!(out.contains("loading media..."));
        assert!(out.contains("* - photo.png\nselected: photo.png\n"));
        assert!(out.contains("[0] media > [1] logs/ > [2] 2024/\n  - a.txt\n  - b.txt\n"));
        assert!(out.ends_with("[0] media > [1] logs/\n  d 2024/\n  - readme.md\n"));
    }

    #[tokio::test]
    async fn commands_typed_during_load_are_replayed() {
        let out = transcript(media(), None, "open media\nls\ncd logs/\n").await;
        assert!(out.ends_with("[0] media > [1] logs/\n  d 2024/\n  - readme.md\n"));
    }

    #[tokio::test]
    async fn breadcrumb_jump() {
        let out = transcript(media(), Some("media"), "cd logs/\ncd 2024/\ncrumb 1\ncrumb 9\n").await;
        assert!(out.contains("no breadcrumb `9`"));
        assert!(out.contains("[0] media > [1] logs/\n  d 2024/\n  - readme.md\n"));
    }

    #[tokio::test]
    async fn back_at_root_closes_bucket_and_lists_buckets() {
        let out = transcript(media(), Some("media"), "back\nls\n").await;
        assert!(out.contains("buckets:\n  media\n"));
        assert!(out.ends_with("no bucket open (try `buckets` or `open <bucket>`)\n"));
    }

    #[tokio::test]
    async fn invalid_navigation_is_reported_not_fatal() {
        let out = transcript(media(), Some("media"), "cd photo.png\nselect logs/\nls\n").await;
        assert!(out.contains("`photo.png/` is not a folder here"));
        assert!(out.contains("`logs/` is not an object here"));
        assert!(out.ends_with("[0] media\n  d logs/\n  - photo.png\n"));
    }

    #[tokio::test]
    async fn newer_open_wins_over_slow_one() {
        let lister = media()
            .with("slow", 200, Ok(vec!["from-slow.txt"]))
            .with("fast", 5, Ok(vec!["from-fast.txt"]));
        let out = transcript(lister, None, "open slow\nopen fast\n").await;
        assert!(out.ends_with("[0] fast\n  - from-fast.txt\n"));
        assert!(!out.contains("from-slow.txt"));
    }

    #[tokio::test]
    async fn failed_load_reports_error() {
        let lister = FakeLister::default().with(
            "flaky",
            1,
            Err(ListError::Malformed("expected array, got object".into())),
        );
        let out = transcript(lister, Some("flaky"), "cd logs/\n").await;
        assert!(out.contains(
            "error loading flaky: listing response was not a list of names: expected array, got object (type `retry`)"
        ));
        assert!(out.ends_with("no listing loaded\n"));
    }

    struct PanickingLister;

    #[async_trait]
    impl KeyLister for PanickingLister {
        async fn list_buckets(&self) -> ListResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn list_keys(&self, _bucket: &str) -> ListResult<Vec<String>> {
            panic!("lister blew up");
        }
    }

    #[tokio::test]
    async fn panicking_lister_ends_in_error_instead_of_hanging() {
        let mut out = Vec::new();
        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            run(
                Arc::new(PanickingLister),
                Some("media".to_string()),
                "ls\n".as_bytes(),
                &mut out,
            ),
        )
        .await;
        assert!(finished.is_ok(), "console did not finish");
        finished.unwrap().unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(
            "error loading media: could not reach listing service: listing task panicked"
        ));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let out = transcript(media(), None, "quit\nbuckets\n").await;
        assert_eq!(out, "type `help` for commands\n");
    }

    #[test]
    fn renders_empty_folder() {
        let mut session = BrowserSession::new();
        let ticket = session.open_bucket("empty");
        session.complete_load(ticket, Ok(Vec::new()));
        assert_eq!(render_view(&session.view()), "[0] empty\n  (empty)\n");
    }
}

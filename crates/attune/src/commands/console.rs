//! Line-oriented focus console: command parsing and execution.

use std::time::Duration;

use attune_focus::{CreateFocusRequest, FocusAction, FocusFilter, FocusService, SessionSnapshot};
use attune_types::{FocusSession, FocusSessionId};
use console::style;

/// Maximum number of sessions printed by `history`.
const HISTORY_LIMIT: usize = 20;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start {
        user: String,
        duration: Duration,
        vendor: Option<String>,
    },
    Pause(String),
    Resume(String),
    Stop(String),
    Status(String),
    History(String),
    Rate {
        id: FocusSessionId,
        quality: u8,
    },
    Help,
    Quit,
}

/// Whether the console keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Exit,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let (cmd, args) = (parts[0].to_ascii_lowercase(), &parts[1..]);

    let user = |usage: &str| -> Result<String, String> {
        match args {
            [user] => Ok((*user).to_string()),
            _ => Err(format!("usage: {usage}")),
        }
    };

    let command = match cmd.as_str() {
        "start" => match args {
            [user, duration] | [user, duration, _] => Command::Start {
                user: (*user).to_string(),
                duration: parse_duration(duration)?,
                vendor: args.get(2).map(|v| (*v).to_string()),
            },
            _ => return Err("usage: start <user> <duration> [vendor]".to_string()),
        },
        "pause" | "resume" | "stop" => {
            let user = user(&format!("{cmd} <user>"))?;
            match cmd.parse::<FocusAction>().map_err(|e| e.to_string())? {
                FocusAction::Pause => Command::Pause(user),
                FocusAction::Resume => Command::Resume(user),
                FocusAction::Stop => Command::Stop(user),
            }
        }
        "status" => Command::Status(user("status <user>")?),
        "history" => Command::History(user("history <user>")?),
        "rate" => match args {
            [id, quality] => Command::Rate {
                id: id
                    .parse()
                    .map_err(|_| format!("invalid session id '{id}'"))?,
                quality: quality
                    .parse()
                    .map_err(|_| format!("invalid quality '{quality}'"))?,
            },
            _ => return Err("usage: rate <session-id> <quality>".to_string()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (type 'help')")),
    };
    Ok(Some(command))
}

/// Parse `90s`, `25m`, `1h30m`, `1h30m15s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c.to_ascii_lowercase() {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid duration '{input}'")),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration '{input}'"))?;
        total = value
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| format!("duration '{input}' is too long"))?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(format!("invalid duration '{input}' (missing unit)"));
    }
    Ok(Duration::from_secs(total))
}

/// Render a duration as `1h30m`, `25m`, `1m30s` or `450ms`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}

/// Executes console commands against the focus service.
pub struct Console {
    service: FocusService,
    json: bool,
}

impl Console {
    pub fn new(service: FocusService, json: bool) -> Self {
        Self { service, json }
    }

    /// Parse and execute one line, printing the outcome.
    pub async fn handle_line(&self, line: &str) -> ControlFlow {
        match parse_command(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => ControlFlow::Continue,
            Err(e) => {
                print_error(&e);
                ControlFlow::Continue
            }
        }
    }

    /// Execute a parsed command.
    pub async fn execute(&self, command: Command) -> ControlFlow {
        let result = match command {
            Command::Quit => return ControlFlow::Exit,
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::Start {
                user,
                duration,
                vendor,
            } => {
                let mut request = CreateFocusRequest::new(&user, duration);
                if let Some(vendor) = vendor {
                    request = request.with_vendor_id(vendor);
                }
                self.service.create(request).await.map(|session| {
                    println!(
                        "started {} for {} ({})",
                        session.id,
                        user,
                        format_duration(session.duration)
                    );
                })
            }
            Command::Pause(user) => self.service.manager().pause(&user).map(|remaining| {
                println!("paused {}, {} left", user, format_duration(remaining));
            }),
            Command::Resume(user) => self.service.manager().resume(&user).map(|remaining| {
                println!("resumed {}, {} left", user, format_duration(remaining));
            }),
            Command::Stop(user) => self
                .service
                .apply(&user, FocusAction::Stop)
                .map(|()| println!("stopped {user}")),
            Command::Status(user) => self.service.status(&user).map(|s| self.print_status(&s)),
            Command::History(user) => self
                .service
                .list(&FocusFilter::new().for_user(&user).with_limit(HISTORY_LIMIT))
                .await
                .map(|sessions| self.print_history(&sessions)),
            Command::Rate { id, quality } => self
                .service
                .rate(id, quality)
                .await
                .map(|session| println!("rated {}: {}", session.id, session.quality)),
        };

        if let Err(e) = result {
            print_error(&e.to_string());
        }
        ControlFlow::Continue
    }

    fn print_status(&self, snapshot: &SessionSnapshot) {
        if self.json {
            let value = serde_json::json!({
                "identity": snapshot.identity,
                "sessionId": snapshot.session_id.to_string(),
                "status": snapshot.status.as_str(),
                "paused": snapshot.paused,
                "remainingMs": snapshot.remaining.as_millis() as u64,
                "durationSecs": snapshot.duration.as_secs(),
                "startedAt": snapshot.started_at.to_rfc3339(),
            });
            println!("{value}");
            return;
        }

        let state = if snapshot.paused { "paused" } else { "running" };
        println!(
            "{}: {} ({}), {} of {} left, session {}",
            snapshot.identity,
            snapshot.status,
            state,
            format_duration(snapshot.remaining),
            format_duration(snapshot.duration),
            snapshot.session_id
        );
    }

    fn print_history(&self, sessions: &[FocusSession]) {
        if self.json {
            match serde_json::to_string(sessions) {
                Ok(json) => println!("{json}"),
                Err(e) => print_error(&e.to_string()),
            }
            return;
        }

        if sessions.is_empty() {
            println!("no sessions");
            return;
        }
        for session in sessions {
            println!(
                "{}  {:<9}  {:>8}  quality {:>2}  {}",
                session.id,
                session.status,
                format_duration(session.duration),
                session.quality,
                session.started_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
}

fn print_error(message: &str) {
    println!("{} {}", style("error:").red().bold(), message);
}

fn print_help() {
    println!("{}", style("Commands").bold());
    println!("  start <user> <duration> [vendor]  Start a session (90s, 25m, 1h30m)");
    println!("  pause <user>                      Pause the running session");
    println!("  resume <user>                     Resume a paused session");
    println!("  stop <user>                       Stop the session");
    println!("  status <user>                     Show the live session");
    println!("  history <user>                    List recent sessions");
    println!("  rate <session-id> <0-10>          Rate a finished session");
    println!("  quit                              Stop all sessions and exit");
}

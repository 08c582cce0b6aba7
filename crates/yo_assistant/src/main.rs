use std::io::{self, BufRead, Write};
use std::process::Command;

use tracing::{info, warn};
use yo_assistant::{config, HttpProviderFactory, LineAction, Session, TerminalHost};
use yosh_term::{activate, logging, EnvConfig, RelayOutcome, ScrollbackHandle};

const BASE_PROMPT: &str = "You are yo, an assistant built into the user's shell. \
Answer shell questions with a single command when one fits, otherwise reply briefly.";

const DOCUMENTATION: &str = "\
yosh: a shell line loop with a built-in assistant.

Usage:
  yo <question>   ask the assistant; a suggested command is offered as the next line
  yo reset        forget the conversation and captured terminal output
  <empty line>    accept the offered command
  -               decline the offered command
  exit            leave yosh

Configuration (~/.yosh/config.json, mode 0600):
  {\"provider\": \"anthropic\" | \"openai\", \"model\": \"...\", \"api_key\": \"...\", \"web_search\": false}
  ~/.yoshkey (mode 0600) holds a bare API key when config.json has none.

Environment:
  YO_PROVIDER, YO_MODEL       override the provider and model
  YO_HISTORY_LIMIT            exchanges kept in context (default 10)
  YO_TOKEN_BUDGET             estimated context tokens (default 4096)
  YO_WEB_SEARCH=1             let the provider search the web
  YO_CHAT_COLOR               escape sequence used for assistant text
  YO_SCROLLBACK_ENABLED=0     disable terminal output capture
  YO_SCROLLBACK_BYTES         capture buffer size (default 1048576)
  YO_SCROLLBACK_LINES         captured lines kept (default 1000)
  YO_LOG, YO_LOG_LEVEL        diagnostics file and filter";

const PROMPT: &str = "yosh$ ";
const EXIT_COMMAND: &str = "exit";
const DECLINE_INPUT: &str = "-";

fn main() -> io::Result<()> {
    let env = EnvConfig::from_env();
    if let Err(error) = logging::init_from_env(&env) {
        eprintln!("yosh: logging disabled: {error}");
    }

    let scrollback = match activate(&env) {
        Ok(RelayOutcome::Relayed(handle)) => handle,
        Ok(RelayOutcome::Skipped(reason)) => {
            info!(?reason, "terminal relay skipped");
            ScrollbackHandle::inactive()
        }
        Err(error) => {
            warn!(%error, "terminal relay unavailable");
            ScrollbackHandle::inactive()
        }
    };

    let mut session = Session::new(Box::new(HttpProviderFactory), Box::new(scrollback))
        .map_err(io::Error::other)?;
    session.enable(BASE_PROMPT, DOCUMENTATION);

    let mut host = TerminalHost::new(io::stdout()).with_chat_color(config::chat_color());
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        session.on_prompt(&mut host);

        let offered = host.take_prefill();
        match offered.as_deref() {
            Some(command) => print!("{PROMPT}[{command}] "),
            None => print!("{PROMPT}"),
        }
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = match (offered, line.trim_end()) {
            (Some(command), "") => command,
            (Some(_), DECLINE_INPUT) => String::new(),
            (_, line) => line.to_string(),
        };
        if line == EXIT_COMMAND {
            break;
        }

        if session.accept(&line, &mut host) == LineAction::Execute && !line.is_empty() {
            run_shell(&line);
        }
    }

    Ok(())
}

fn run_shell(line: &str) {
    match Command::new("sh").arg("-c").arg(line).status() {
        Ok(status) if !status.success() => info!(%status, "command failed"),
        Ok(_) => {}
        Err(error) => eprintln!("yosh: {error}"),
    }
}

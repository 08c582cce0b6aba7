//! Fixed model-facing texts: the system prompt and the synthetic messages the
//! session sends on the user's behalf.

use std::fs;
use std::path::Path;

const OS_RELEASE_PATH: &str = "/etc/os-release";

const TOOL_GUIDANCE: &str = "\
You have four tools available. Choose the most appropriate one:

- command: Generate a shell command for the user to review and execute. Always provide
  a brief explanation. You will not see the output unless you request it.
  Prefer short, focused commands. For multi-step tasks, set pending=true and you'll
  receive terminal output after execution to continue with the next step.
  If a task requires a command, you MUST use this tool - never describe a command
  in a chat response instead of providing it as an actual command.

- chat: Respond with text ONLY when no command is needed (pure questions,
  explanations, or conversational replies). Never use chat to suggest a command.

- scrollback: Request recent terminal output when you need to see what happened
  (errors, command results, etc.). You'll get another turn to respond after.
  Note: scrollback captures raw terminal I/O, so it may contain duplicate or
  garbled-looking lines from readline editing (e.g. the user pressing up/down
  arrows to navigate history). Ignore these artifacts and focus on actual output.

- docs: Request yosh documentation when the user asks about yosh features,
  configuration, environment variables, or usage.

Multi-step sequences: When you set pending=true on a command, you'll receive a
[continuation] message with terminal output after the user executes it. Continue
with the next command or use chat to wrap up. If the user edited the command
substantially, acknowledge and wrap up with chat (don't continue the sequence).
The last command in a sequence should NOT have pending=true.";

pub const EXPLANATION_RETRY: &str = "Your command response is missing the required \"explanation\" field. Please respond again with the same command but include a brief explanation. The explanation is shown to the user before the command and is essential for them to understand what the command does.";

pub const NO_TERMINAL_OUTPUT: &str = "(No terminal output available)";
pub const NO_CONTINUATION_OUTPUT: &str = "(no output)";

/// Caller prompt, tool guidance, then the distro line when one is known.
pub fn system_prompt(base: &str, distro: Option<&str>) -> String {
    let mut prompt = format!("{base}\n\n{TOOL_GUIDANCE}");
    if let Some(distro) = distro.filter(|distro| !distro.is_empty()) {
        prompt.push_str(&format!("\nThe user is running {distro}."));
    }
    prompt
}

pub fn scrollback_result(excerpt: &str) -> String {
    let excerpt = if excerpt.is_empty() {
        NO_TERMINAL_OUTPUT
    } else {
        excerpt
    };
    format!("Here is the recent terminal output you requested:\n```\n{excerpt}\n```")
}

pub fn docs_result(documentation: &str) -> String {
    format!(
        "Here is the yosh documentation:\n\n{documentation}\n\n\
         Now please answer the user's original question based on this documentation."
    )
}

/// Synthetic query sent after the user ran a pending command.
pub fn continuation_query(suggested: &str, executed: &str, excerpt: &str) -> String {
    let excerpt = if excerpt.is_empty() {
        NO_CONTINUATION_OUTPUT
    } else {
        excerpt
    };
    if suggested != executed {
        format!(
            "[continuation] You suggested: {suggested}\n\
             The user edited and executed: {executed}\n\
             Here is the terminal output:\n```\n{excerpt}\n```"
        )
    } else {
        format!(
            "[continuation] The user executed the previous command. \
             Here is the terminal output:\n```\n{excerpt}\n```"
        )
    }
}

pub fn detect_distro() -> Option<String> {
    read_distro(Path::new(OS_RELEASE_PATH))
}

fn read_distro(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .and_then(|contents| parse_os_release(&contents))
}

/// `PRETTY_NAME`, else `NAME VERSION`, else `NAME`.
pub fn parse_os_release(contents: &str) -> Option<String> {
    let mut pretty_name = None;
    let mut name = None;
    let mut version = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = unquote(value);
        match key {
            "PRETTY_NAME" => pretty_name = Some(value),
            "NAME" => name = Some(value),
            "VERSION" => version = Some(value),
            _ => {}
        }
    }

    if let Some(pretty_name) = pretty_name.filter(|value| !value.is_empty()) {
        return Some(pretty_name.to_string());
    }
    let name = name.filter(|value| !value.is_empty())?;
    match version.filter(|value| !value.is_empty()) {
        Some(version) => Some(format!("{name} {version}")),
        None => Some(name.to_string()),
    }
}

fn unquote(value: &str) -> &str {
    match value.strip_prefix('"') {
        Some(rest) => rest.rfind('"').map_or(rest, |end| &rest[..end]),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_appends_guidance_and_distro() {
        let prompt = system_prompt("Be helpful.", Some("Debian GNU/Linux 12 (bookworm)"));
        assert!(prompt.starts_with("Be helpful.\n\nYou have four tools available."));
        assert!(prompt.ends_with(
            "should NOT have pending=true.\nThe user is running Debian GNU/Linux 12 (bookworm)."
        ));

        let prompt = system_prompt("Be helpful.", None);
        assert!(prompt.ends_with("should NOT have pending=true."));
    }

    #[test]
    fn os_release_prefers_pretty_name() {
        let contents = "NAME=\"Ubuntu\"\nVERSION=\"24.04 LTS (Noble Numbat)\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\n";
        assert_eq!(parse_os_release(contents).as_deref(), Some("Ubuntu 24.04 LTS"));
    }

    #[test]
    fn os_release_falls_back_to_name_and_version() {
        assert_eq!(
            parse_os_release("NAME=Alpine\nVERSION=\"3.20\"\nPRETTY_NAME=\"\"\n").as_deref(),
            Some("Alpine 3.20")
        );
        assert_eq!(parse_os_release("NAME=Arch\n").as_deref(), Some("Arch"));
        assert_eq!(parse_os_release("ID=unknown\n"), None);
        assert_eq!(read_distro(Path::new("/nonexistent/os-release")), None);
    }

    #[test]
    fn continuation_query_notes_edits() {
        let query = continuation_query("make", "make -j8", "");
        assert_eq!(
            query,
            "[continuation] You suggested: make\nThe user edited and executed: make -j8\nHere is the terminal output:\n```\n(no output)\n```"
        );

        let query = continuation_query("make", "make", "done\n");
        assert!(query.starts_with("[continuation] The user executed the previous command."));
        assert!(query.contains("```\ndone\n\n```"));
    }

    #[test]
    fn follow_up_results_wrap_content() {
        assert_eq!(
            scrollback_result(""),
            "Here is the recent terminal output you requested:\n```\n(No terminal output available)\n```"
        );
        assert!(docs_result("DOCS").contains("documentation:\n\nDOCS\n\nNow please answer"));
    }
}

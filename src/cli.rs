//! Line commands understood by the interactive front end.

use crate::error::CommandError;

pub const HELP: &str = "\
Commands:
  play <query>   search and pick a track to enqueue
  mix <url>      enqueue a playlist, mix or single video
  queue          show pending tracks
  now            show the current track
  pause          pause playback
  resume         resume playback
  skip           stop the current track and move on
  help, ?        show this help
  quit, exit, q  stop playback and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Mix(String),
    Queue,
    Now,
    Pause,
    Resume,
    Skip,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. The command word is case-insensitive; the
    /// argument keeps its case and inner spacing.
    ///
    /// A blank line is not a command and yields `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((w, rest)) => (w, rest.trim()),
            None => (line, ""),
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "play" => Self::Play(required(arg, "play <query>")?),
            "mix" => Self::Mix(required(arg, "mix <youtube mix/playlist url>")?),
            "queue" => Self::Queue,
            "now" => Self::Now,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "skip" => Self::Skip,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        Ok(Some(cmd))
    }
}

fn required(arg: &str, usage: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(arg.to_string())
    }
}

/// Turn the user's answer to "which candidate?" into a zero-based index.
///
/// Blank means the first one; anything that is not a number in `1..=count`
/// is `None`, which the session treats the same way.
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() {
        return Some(0);
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Some(n - 1),
        _ => None,
    }
}

//! Read commands line by line and drive the session.

use std::io::{self, BufRead, Write};

use crate::cli::{self, Command};
use crate::session::Session;
use crate::track::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(session: &Session, input: &mut R, out: &mut W) -> io::Result<()> {
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(());
        };
        let flow = match Command::parse(&line) {
            Ok(Some(cmd)) => execute(session, cmd, input, out)?,
            Ok(None) => Flow::Continue,
            Err(e) => {
                writeln!(out, "{e}")?;
                Flow::Continue
            }
        };
        if flow == Flow::Quit {
            return Ok(());
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

pub fn execute<R: BufRead, W: Write>(
    session: &Session,
    cmd: Command,
    input: &mut R,
    out: &mut W,
) -> io::Result<Flow> {
    match cmd {
        Command::Play(query) => {
            // The chooser cannot return an error, so prompt failures are kept
            // aside and surfaced after the session call.
            let mut prompt_err = None;
            let picked = session.enqueue_by_query(&query, |candidates| {
                match choose(candidates, input, out) {
                    Ok(choice) => choice,
                    Err(e) => {
                        prompt_err = Some(e);
                        None
                    }
                }
            });
            if let Some(e) = prompt_err {
                return Err(e);
            }
            match picked {
                Ok(track) => writeln!(out, "Enqueued: {track}")?,
                Err(e) => writeln!(out, "! {e}")?,
            }
        }
        Command::Mix(url) => match session.enqueue_playlist(&url) {
            Ok(n) => writeln!(out, "Enqueued {n} tracks from mix/playlist.")?,
            Err(e) => writeln!(out, "! {e}")?,
        },
        Command::Queue => {
            let queued = session.queue();
            if queued.is_empty() {
                writeln!(out, "(queue is empty)")?;
            } else {
                writeln!(out, "Queue:")?;
                for (i, t) in queued.iter().enumerate() {
                    writeln!(out, "  {}. {t}", i + 1)?;
                }
            }
        }
        Command::Now => match session.now_playing() {
            Some(t) => writeln!(out, "Now playing: {t} ({})", session.state())?,
            None => writeln!(out, "Nothing is playing.")?,
        },
        Command::Pause => session.pause(),
        Command::Resume => session.resume(),
        Command::Skip => session.skip(),
        Command::Help => writeln!(out, "{}", cli::HELP)?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn choose<R: BufRead, W: Write>(
    candidates: &[Track],
    input: &mut R,
    out: &mut W,
) -> io::Result<Option<usize>> {
    writeln!(out, "Search results:")?;
    for (i, t) in candidates.iter().enumerate() {
        writeln!(out, "  {}. {t}", i + 1)?;
    }
    write!(out, "Choose a track number (default 1): ")?;
    out.flush()?;
    let answer = read_line(input)?.unwrap_or_default();
    Ok(cli::parse_choice(&answer, candidates.len()))
}

#[cfg(test)]
mod tests;

//! Interactive questions behind a trait, so callers can be driven by a
//! terminal, a `--yes` flag or a script in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Prompt {
    /// Ask a yes/no question. Only `y` or `yes` (any case) count as yes.
    fn confirm(&mut self, question: &str) -> bool;

    /// Like [`Prompt::confirm`], but only a bare `y` (any case) counts.
    fn confirm_strict(&mut self, question: &str) -> bool;

    /// Pick one of `options`; returns the zero-based index, or `None` when the
    /// user declines with `n`.
    fn choose(&mut self, question: &str, options: &[String]) -> Option<usize>;
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn is_y(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Outcome of reading one answer to a numbered menu.
#[derive(Debug, PartialEq, Eq)]
pub enum Choice {
    Picked(usize),
    Declined,
    Invalid,
}

pub fn parse_choice(answer: &str, count: usize) -> Choice {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("n") {
        return Choice::Declined;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Choice::Picked(n - 1),
        _ => Choice::Invalid,
    }
}

/// Reads answers from any line source and echoes questions to a writer.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        let _ = write!(self.output, "{question} ");
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        self.ask(&format!("{question} (y/n):"))
            .is_some_and(|answer| is_yes(&answer))
    }

    fn confirm_strict(&mut self, question: &str) -> bool {
        self.ask(&format!("{question} (y/n):"))
            .is_some_and(|answer| is_y(&answer))
    }

    fn choose(&mut self, question: &str, options: &[String]) -> Option<usize> {
        for (idx, option) in options.iter().enumerate() {
            let _ = writeln!(self.output, "{}. {}", idx + 1, option);
        }
        loop {
            // End of input counts as declining.
            let answer = self.ask(question)?;
            match parse_choice(&answer, options.len()) {
                Choice::Picked(idx) => return Some(idx),
                Choice::Declined => return None,
                Choice::Invalid => {
                    let _ = writeln!(
                        self.output,
                        "Invalid selection. Please enter a valid number or 'n' to cancel."
                    );
                }
            }
        }
    }
}

/// Prompt on the process terminal.
pub type TerminalPrompt = LinePrompt<io::StdinLock<'static>, io::Stdout>;

pub fn terminal() -> TerminalPrompt {
    LinePrompt::new(io::stdin().lock(), io::stdout())
}

/// Answers yes to every confirmation and takes the first option of every menu.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }

    fn confirm_strict(&mut self, _question: &str) -> bool {
        true
    }

    fn choose(&mut self, _question: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() { None } else { Some(0) }
    }
}

/// Replays canned answers; records the questions it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().is_some_and(|a| is_yes(&a))
    }

    fn confirm_strict(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().is_some_and(|a| is_y(&a))
    }

    fn choose(&mut self, question: &str, options: &[String]) -> Option<usize> {
        self.asked.push(question.to_string());
        while let Some(answer) = self.answers.pop_front() {
            match parse_choice(&answer, options.len()) {
                Choice::Picked(idx) => return Some(idx),
                Choice::Declined => return None,
                Choice::Invalid => continue,
            }
        }
        None
    }
}

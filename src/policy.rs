//! Interaction policies and operator prompts.
//!
//! Every pass funnels its confirmations through a [`Decider`], so the
//! do-nothing / ask / apply-to-all behaviour lives in exactly one place.

use clap::ValueEnum;
use std::io::{self, BufRead, Write};

/// How a pass treats the problems it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolutionPolicy {
    /// Do not run the pass.
    #[default]
    #[value(name = "do_nothing")]
    Skip,
    /// Ask before every action.
    #[value(name = "ask")]
    AskEach,
    /// Apply every action without asking.
    #[value(name = "apply_to_all")]
    ApplyToAll,
}

/// What to do with the files of the auxiliary directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConsolidateMode {
    #[default]
    #[value(name = "do_nothing")]
    DoNothing,
    Move,
    Copy,
}

/// An operator's reply to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Yes, and stop asking for the rest of this pass.
    All,
}

impl Answer {
    /// Parses a reply line; `None` means the prompt should be repeated.
    pub fn parse(reply: &str) -> Option<Self> {
        match reply.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Answer::Yes),
            "n" | "no" => Some(Answer::No),
            "a" | "all" => Some(Answer::All),
            _ => None,
        }
    }
}

/// Source of operator answers.
pub trait Prompter {
    fn ask(&mut self, question: &str) -> io::Result<Answer>;
}

/// Line-oriented prompter over any reader/writer pair.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter reading from stdin and writing questions to stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn ask(&mut self, question: &str) -> io::Result<Answer> {
        let mut line = String::new();
        loop {
            write!(self.output, "{} (y/n/a): ", question)?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed while waiting for an answer",
                ));
            }

            if let Some(answer) = Answer::parse(&line) {
                return Ok(answer);
            }
        }
    }
}

/// Per-pass policy state.
///
/// Once the pass is in apply-to-all mode, either because the caller chose it
/// or because the operator answered "all", it never prompts again.
#[derive(Debug, Clone, Copy)]
pub struct Decider {
    policy: ResolutionPolicy,
}

impl Decider {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Decides whether the action described by `question` goes ahead.
    pub fn approve<P: Prompter + ?Sized>(
        &mut self,
        prompter: &mut P,
        question: &str,
    ) -> io::Result<bool> {
        match self.policy {
            ResolutionPolicy::Skip => Ok(false),
            ResolutionPolicy::ApplyToAll => Ok(true),
            ResolutionPolicy::AskEach => match prompter.ask(question)? {
                Answer::Yes => Ok(true),
                Answer::No => Ok(false),
                Answer::All => {
                    self.policy = ResolutionPolicy::ApplyToAll;
                    Ok(true)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct CountingPrompter {
        answer: Answer,
        asked: usize,
    }

    impl Prompter for CountingPrompter {
        fn ask(&mut self, _question: &str) -> io::Result<Answer> {
            self.asked += 1;
            Ok(self.answer)
        }
    }

    #[test]
    fn test_answer_parse() {
        assert_eq!(Answer::parse("Y\n"), Some(Answer::Yes));
        assert_eq!(Answer::parse(" yes "), Some(Answer::Yes));
        assert_eq!(Answer::parse("no"), Some(Answer::No));
        assert_eq!(Answer::parse("ALL"), Some(Answer::All));
        assert_eq!(Answer::parse(""), None);
        assert_eq!(Answer::parse("maybe"), None);
    }

    #[test]
    fn test_line_prompter_repeats_until_valid() {
        let mut output = Vec::new();
        let mut prompter = LinePrompter::new(Cursor::new("huh\n\nn\n"), &mut output);

        assert_eq!(prompter.ask("Delete x?").unwrap(), Answer::No);
        let written = String::from_utf8(output).unwrap();
        assert_eq!(written.matches("Delete x? (y/n/a): ").count(), 3);
    }

    #[test]
    fn test_line_prompter_eof_is_error() {
        let mut prompter = LinePrompter::new(Cursor::new(""), Vec::new());
        let err = prompter.ask("Delete x?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_skip_and_apply_to_all_never_prompt() {
        let mut prompter = CountingPrompter {
            answer: Answer::Yes,
            asked: 0,
        };

        let mut skip = Decider::new(ResolutionPolicy::Skip);
        assert!(!skip.approve(&mut prompter, "q").unwrap());

        let mut all = Decider::new(ResolutionPolicy::ApplyToAll);
        assert!(all.approve(&mut prompter, "q").unwrap());
        assert!(all.approve(&mut prompter, "q").unwrap());

        assert_eq!(prompter.asked, 0);
    }

    #[test]
    fn test_answer_all_stops_prompting() {
        let mut prompter = CountingPrompter {
            answer: Answer::All,
            asked: 0,
        };
        let mut decider = Decider::new(ResolutionPolicy::AskEach);

        assert!(decider.approve(&mut prompter, "first").unwrap());
        assert_eq!(decider.policy(), ResolutionPolicy::ApplyToAll);
        assert!(decider.approve(&mut prompter, "second").unwrap());
        assert!(decider.approve(&mut prompter, "third").unwrap());
        assert_eq!(prompter.asked, 1);
    }

    #[test]
    fn test_ask_each_follows_answers() {
        let mut prompter = CountingPrompter {
            answer: Answer::No,
            asked: 0,
        };
        let mut decider = Decider::new(ResolutionPolicy::AskEach);

        assert!(!decider.approve(&mut prompter, "q").unwrap());
        assert!(!decider.approve(&mut prompter, "q").unwrap());
        assert_eq!(prompter.asked, 2);
    }
}

//! The learn-on-miss conversation loop.
//!
//! Each turn reads a question, normalizes it and matches it against the
//! knowledge base. A hit prints the stored answer with a timestamp; a miss
//! asks the user to teach an answer, which is appended under the
//! *normalized* question and written through to the store immediately.
//! `quit` ends the session and runs the self-consistency evaluation.

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use tutor_core::{
    evaluate, Evaluation, KnowledgeBase, KnowledgeEntry, KnowledgeStore, Lookup, Matcher,
    TextNormalizer, TutorResult,
};

use crate::console::Console;

pub const QUIT: &str = "quit";
pub const SKIP: &str = "skip";

pub const QUESTION_PROMPT: &str = "You: ";
pub const TEACH_PROMPT: &str = "Type the answer or skip to skip: ";
pub const MISS_REPLY: &str = "Bot: Idk! can you teach me please?";
pub const LEARNED_REPLY: &str = "Bot: Thank you! I learned a new response!";
pub const SAVE_FAILED_REPLY: &str = "Bot: Sorry, I could not save that answer.";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a single turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Answered,
    Learned,
    Skipped,
    SaveFailed,
    Quit,
}

pub struct Session<'a> {
    kb: KnowledgeBase,
    store: &'a dyn KnowledgeStore,
    normalizer: &'a dyn TextNormalizer,
    matcher: Matcher,
    save_retries: u32,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<'a> Session<'a> {
    pub fn new(
        kb: KnowledgeBase,
        store: &'a dyn KnowledgeStore,
        normalizer: &'a dyn TextNormalizer,
    ) -> Self {
        Self {
            kb,
            store,
            normalizer,
            matcher: Matcher::default(),
            save_retries: 1,
            clock: local_now,
        }
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Extra save attempts after a failed write-through.
    pub fn with_save_retries(mut self, retries: u32) -> Self {
        self.save_retries = retries;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn into_knowledge_base(self) -> KnowledgeBase {
        self.kb
    }

    /// Normalize `raw` and resolve it against the knowledge base.
    pub fn ask(&self, raw: &str) -> Lookup<'_> {
        let query = self.normalizer.normalize(raw);
        self.matcher.lookup(&query, &self.kb)
    }

    /// Normalize `raw_question` and store it with `answer`. Returns the
    /// normalized question.
    pub fn learn(&mut self, raw_question: &str, answer: &str) -> TutorResult<String> {
        let question = self.normalizer.normalize(raw_question);
        self.remember(question.clone(), answer.to_string())?;
        Ok(question)
    }

    /// Append an already-normalized pair and persist the whole knowledge
    /// base. When every save attempt fails the append is undone, so memory
    /// never holds an entry the store does not.
    fn remember(&mut self, question: String, answer: String) -> TutorResult<()> {
        self.kb.append(KnowledgeEntry { question, answer });

        let mut attempt = 0;
        loop {
            match self.store.save(&self.kb) {
                Ok(()) => {
                    info!("learned entry #{}", self.kb.len());
                    return Ok(());
                }
                Err(e) if attempt < self.save_retries => {
                    attempt += 1;
                    warn!("save failed (attempt {attempt}), retrying: {e}");
                }
                Err(e) => {
                    self.kb.rollback_last();
                    return Err(e);
                }
            }
        }
    }

    pub fn evaluate(&self) -> Evaluation {
        evaluate(&self.kb, self.normalizer, &self.matcher)
    }

    /// Run one question/answer exchange.
    pub fn turn(&mut self, console: &mut dyn Console) -> TutorResult<Turn> {
        let Some(input) = console.read_line(QUESTION_PROMPT)? else {
            debug!("input closed");
            return Ok(Turn::Quit);
        };
        if input.to_lowercase() == QUIT {
            return Ok(Turn::Quit);
        }

        let query = self.normalizer.normalize(&input);
        let reply = match self.matcher.lookup(&query, &self.kb) {
            Lookup::Found {
                question,
                answer,
                score,
            } => {
                debug!("{query:?} matched {question:?} ({score:.3})");
                let now = (self.clock)().format(TIMESTAMP_FORMAT);
                Some(format!("Bot ({now}): {answer}"))
            }
            Lookup::NotFound => None,
        };
        if let Some(reply) = reply {
            console.write_line(&reply)?;
            return Ok(Turn::Answered);
        }

        console.write_line(MISS_REPLY)?;
        let Some(answer) = console.read_line(TEACH_PROMPT)? else {
            debug!("input closed while teaching");
            return Ok(Turn::Quit);
        };
        if answer.to_lowercase() == SKIP {
            return Ok(Turn::Skipped);
        }

        match self.remember(query, answer) {
            Ok(()) => {
                console.write_line(LEARNED_REPLY)?;
                Ok(Turn::Learned)
            }
            Err(e) => {
                warn!("dropping learned answer: {e}");
                console.write_line(SAVE_FAILED_REPLY)?;
                Ok(Turn::SaveFailed)
            }
        }
    }

    /// Loop until `quit` or end of input, then print and return the
    /// evaluation of the final knowledge base.
    pub fn run(&mut self, console: &mut dyn Console) -> TutorResult<Evaluation> {
        loop {
            match self.turn(console)? {
                Turn::Quit => break,
                turn => debug!("turn ended: {turn:?}"),
            }
        }

        let eval = self.evaluate();
        for line in eval.metrics().to_string().lines() {
            console.write_line(line)?;
        }
        Ok(eval)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::NaiveDate;
    use tutor_core::{LexiconNormalizer, SimpleNormalizer, TutorError};
    use tutor_store::JsonFileStore;

    use super::*;
    use crate::console::ScriptedConsole;

    /// Store double that records every save and can fail a number of times.
    #[derive(Default)]
    struct RecordingStore {
        saves: RefCell<Vec<KnowledgeBase>>,
        failures_left: Cell<u32>,
    }

    impl RecordingStore {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: Cell::new(times),
                ..Self::default()
            }
        }
    }

    impl KnowledgeStore for RecordingStore {
        fn load(&self) -> TutorResult<KnowledgeBase> {
            Ok(self.saves.borrow().last().cloned().unwrap_or_default())
        }

        fn save(&self, kb: &KnowledgeBase) -> TutorResult<()> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(TutorError::Storage("disk full".into()));
            }
            self.saves.borrow_mut().push(kb.clone());
            Ok(())
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn bot_kb() -> KnowledgeBase {
        KnowledgeBase::from_entries(vec![KnowledgeEntry::new(
            "what be you name ?",
            "I am a bot",
        )])
    }

    #[test]
    fn test_answers_known_question_with_timestamp() {
        let store = RecordingStore::default();
        let lexicon = LexiconNormalizer::builtin().unwrap();
        let mut session = Session::new(bot_kb(), &store, &lexicon).with_clock(fixed_clock);
        let mut console = ScriptedConsole::new(["What's your name?"]);

        assert_eq!(session.turn(&mut console).unwrap(), Turn::Answered);
        assert_eq!(
            console.transcript,
            vec![
                "You: What's your name?",
                "Bot (2024-01-02 03:04:05): I am a bot",
            ]
        );
        assert!(store.saves.borrow().is_empty());
    }

    #[test]
    fn test_learn_then_match() {
        let store = RecordingStore::default();
        let lexicon = LexiconNormalizer::builtin().unwrap();
        let mut session =
            Session::new(KnowledgeBase::new(), &store, &lexicon).with_clock(fixed_clock);
        let mut console = ScriptedConsole::new([
            "What is your favourite colour?",
            "Blue",
            "what was your favourite colour",
            "quit",
        ]);

        session.run(&mut console).unwrap();

        assert_eq!(
            &console.transcript[..6],
            &[
                "You: What is your favourite colour?",
                MISS_REPLY,
                "Type the answer or skip to skip: Blue",
                LEARNED_REPLY,
                "You: what was your favourite colour",
                "Bot (2024-01-02 03:04:05): Blue",
            ]
        );
        let kb = session.knowledge_base();
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.entries()[0].question, "what be you favourite colour ?");
        assert_eq!(store.saves.borrow().len(), 1);
    }

    #[test]
    fn test_skip_does_not_mutate() {
        let store = RecordingStore::default();
        let mut session = Session::new(bot_kb(), &store, &SimpleNormalizer);
        let mut console = ScriptedConsole::new(["tell me a joke", "SkIp"]);

        assert_eq!(session.turn(&mut console).unwrap(), Turn::Skipped);
        assert_eq!(session.knowledge_base(), &bot_kb());
        assert!(store.saves.borrow().is_empty());
    }

    #[test]
    fn test_quit_any_case_ends_and_evaluates_once() {
        let store = RecordingStore::default();
        let mut session = Session::new(bot_kb(), &store, &SimpleNormalizer);
        let mut console = ScriptedConsole::new(["QUIT", "never read"]);

        let eval = session.run(&mut console).unwrap();

        assert_eq!(eval.total, 1);
        assert_eq!(console.remaining(), 1);
        assert_eq!(
            console.transcript,
            vec![
                "You: QUIT",
                "Accuracy: 1.00",
                "Precision: 1.00",
                "Recall: 1.00",
                "F1 Score: 1.00",
            ]
        );
    }

    #[test]
    fn test_end_of_input_quits() {
        let store = RecordingStore::default();
        let mut session = Session::new(KnowledgeBase::new(), &store, &SimpleNormalizer);
        let mut console = ScriptedConsole::new(["unknown thing"]);

        let eval = session.run(&mut console).unwrap();
        assert_eq!(eval.total, 0);
        assert!(session.knowledge_base().is_empty());
        assert_eq!(console.transcript.last().unwrap(), "F1 Score: 0.00");
    }

    #[test]
    fn test_save_retry_recovers() {
        let store = RecordingStore::failing(1);
        let mut session = Session::new(KnowledgeBase::new(), &store, &SimpleNormalizer);
        let mut console = ScriptedConsole::new(["hello there", "hi"]);

        assert_eq!(session.turn(&mut console).unwrap(), Turn::Learned);
        assert_eq!(session.knowledge_base().len(), 1);
        assert_eq!(store.saves.borrow().len(), 1);
    }

    #[test]
    fn test_save_failure_rolls_back() {
        let store = RecordingStore::failing(2);
        let mut session = Session::new(bot_kb(), &store, &SimpleNormalizer);
        let mut console = ScriptedConsole::new(["zzzz", "sleeping"]);

        assert_eq!(session.turn(&mut console).unwrap(), Turn::SaveFailed);
        assert_eq!(session.knowledge_base(), &bot_kb());
        assert_eq!(console.transcript.last().unwrap(), SAVE_FAILED_REPLY);
        assert!(!console.transcript.iter().any(|l| l == LEARNED_REPLY));
    }

    #[test]
    fn test_no_retries_configured() {
        let store = RecordingStore::failing(1);
        let mut session =
            Session::new(KnowledgeBase::new(), &store, &SimpleNormalizer).with_save_retries(0);
        let err = session.learn("hello", "hi").unwrap_err();
        assert!(matches!(err, TutorError::Storage(_)));
        assert!(session.knowledge_base().is_empty());
    }

    #[test]
    fn test_learned_entries_persist_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("kb.json"));
        store.init().unwrap();
        let lexicon = LexiconNormalizer::builtin().unwrap();

        let mut session = Session::new(store.load().unwrap(), &store, &lexicon);
        let question = session.learn("Where were you born?", "In a lab").unwrap();
        assert_eq!(question, "where be you bear ?");

        let reloaded = store.load().unwrap();
        assert_eq!(&reloaded, session.knowledge_base());

        let session = Session::new(reloaded, &store, &lexicon);
        assert_eq!(session.ask("where were you born").answer(), Some("In a lab"));
    }
}

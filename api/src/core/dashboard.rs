//! Process-local usage counters for the dashboard.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Interaction kinds reported by the frontend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    Search,
    Chat,
    Question,
    McqAttempt,
    McqCorrect,
    McqWrong,
}

impl FromStr for Interaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "chat" => Ok(Self::Chat),
            "question" => Ok(Self::Question),
            "mcq_attempt" => Ok(Self::McqAttempt),
            "mcq_correct" => Ok(Self::McqCorrect),
            "mcq_wrong" => Ok(Self::McqWrong),
            other => Err(format!("unknown interaction type: {other}")),
        }
    }
}

#[derive(Debug, Default)]
pub struct DashboardCounters {
    searches: AtomicU64,
    chats: AtomicU64,
    questions: AtomicU64,
    mcq_attempted: AtomicU64,
    mcq_correct: AtomicU64,
    mcq_wrong: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub total_searches: u64,
    pub total_chats: u64,
    pub total_questions: u64,
    pub total_mcq_attempted: u64,
    pub mcq_correct: u64,
    pub mcq_wrong: u64,
    /// Rounded percentage of correct answers among attempts.
    pub mcq_accuracy: u64,
}

impl DashboardCounters {
    pub fn record(&self, kind: Interaction) {
        let bump = |c: &AtomicU64| {
            c.fetch_add(1, Ordering::Relaxed);
        };
        match kind {
            Interaction::Search => bump(&self.searches),
            Interaction::Chat => bump(&self.chats),
            Interaction::Question => bump(&self.questions),
            Interaction::McqAttempt => bump(&self.mcq_attempted),
            Interaction::McqCorrect => {
                bump(&self.mcq_correct);
                bump(&self.mcq_attempted);
            }
            Interaction::McqWrong => {
                bump(&self.mcq_wrong);
                bump(&self.mcq_attempted);
            }
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let attempted = read(&self.mcq_attempted);
        let correct = read(&self.mcq_correct);
        let accuracy = if attempted == 0 {
            0
        } else {
            (correct * 100 + attempted / 2) / attempted
        };

        DashboardSnapshot {
            total_searches: read(&self.searches),
            total_chats: read(&self.chats),
            total_questions: read(&self.questions),
            total_mcq_attempted: attempted,
            mcq_correct: correct,
            mcq_wrong: read(&self.mcq_wrong),
            mcq_accuracy: accuracy,
        }
    }
}

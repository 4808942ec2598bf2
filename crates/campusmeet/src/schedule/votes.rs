/// Vote values and tallying
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Yes,
    No,
    Maybe,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteValue::Yes => "yes",
            VoteValue::No => "no",
            VoteValue::Maybe => "maybe",
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(VoteValue::Yes),
            "no" => Ok(VoteValue::No),
            "maybe" => Ok(VoteValue::Maybe),
            other => Err(format!("Invalid vote value: {other}")),
        }
    }
}

/// One candidate start/end pair of a private event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTime {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A stored vote joined with the voter's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub user_id: String,
    pub name: Option<String>,
    pub time_index: usize,
    pub vote: VoteValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStats {
    pub yes: u32,
    pub no: u32,
    pub maybe: u32,
}

impl VoteStats {
    pub fn total(&self) -> u32 {
        self.yes + self.no + self.maybe
    }
}

/// Counts per vote value. Values nobody picked stay at zero.
pub fn tally<'a>(votes: impl IntoIterator<Item = &'a VoteRecord>) -> VoteStats {
    let mut stats = VoteStats::default();
    for v in votes {
        match v.vote {
            VoteValue::Yes => stats.yes += 1,
            VoteValue::No => stats.no += 1,
            VoteValue::Maybe => stats.maybe += 1,
        }
    }
    stats
}

/// Stats for a single proposed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub time_index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: VoteStats,
    pub voters: Vec<VoteRecord>,
}

/// One entry per proposed time, in proposal order, including unvoted candidates.
///
/// Votes pointing past the end of `proposed` are not counted.
pub fn tally_by_candidate(proposed: &[ProposedTime], votes: &[VoteRecord]) -> Vec<CandidateTally> {
    proposed
        .iter()
        .enumerate()
        .map(|(idx, time)| {
            let voters: Vec<VoteRecord> = votes
                .iter()
                .filter(|v| v.time_index == idx)
                .cloned()
                .collect();
            CandidateTally {
                time_index: idx,
                start: time.start,
                end: time.end,
                stats: tally(&voters),
                voters,
            }
        })
        .collect()
}

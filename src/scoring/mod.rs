pub mod caig;
pub mod commit;
pub mod effort;
pub mod history;
pub mod sir;

pub use caig::{caig_rank, sort_by_rank, CaigRanker, RankedMarker};
pub use commit::{classify_touch, commit_relevance, recent_commits, CommitRecord, Touch};
pub use effort::{base_cost, length_factor, EffortEstimate, EffortScorer, AGE_THRESHOLD_DAYS};
pub use history::{FileHistory, HistoryIndex};
pub use sir::{
    bounded_reachability, heaviest_chain, rank_by_sir, ImpactTier, SirComponents, SirScore,
    SirScorer,
};

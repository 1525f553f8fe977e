//! Pure-function extractors over text (spec §4.2). No I/O lives here —
//! storage and orchestration is the caller's job.

pub mod compound;
pub mod concept;
pub mod decision;
pub mod voting;

pub use compound::{CompoundExtractor, MAX_COMPONENTS};
pub use concept::ConceptExtractor;
pub use decision::DecisionExtractor;
pub use voting::{ConceptSource, ConceptVote, ConceptVoter, RegexSource, VoterConfig, VotingStrategy};

//! Selection layer: the eligible-photo index, the anti-repetition sampler,
//! and portrait pairing.

pub mod index;
pub mod pairing;
pub mod sampler;

pub use index::SelectionIndex;
pub use pairing::find_partner;
pub use sampler::{AntiRepetitionSampler, RecencyWindow, YearBudget};

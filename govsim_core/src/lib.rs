//! GovSim Core - DAO governance generation metrics
//!
//! This library holds the ledger-independent half of the simulation:
//! 1. **Profiles**: per-generation calibration of latency, compliance, cost and ROI
//! 2. **Sampling**: truncated normal draws from a single seeded stream
//! 3. **Classification**: acceptance and compliance-violation rules
//! 4. **Records**: rounded output rows and per-generation summaries

pub mod classifier;
pub mod profile;
pub mod record;
pub mod sampler;
pub mod sequencer;
pub mod summary;
pub mod synthesizer;

// Re-export key types for convenience
pub use classifier::{classify, Classification, ComplianceViolation, DecisionOutcome};
pub use profile::{DaoProfile, Generation, ProfileCatalog, ProfileError};
pub use record::{RunRecord, RunRecordBuilder, COLUMNS};
pub use sampler::{BoundedSampler, SamplingError};
pub use sequencer::RunSequencer;
pub use summary::{summarize, GenerationSummary};
pub use synthesizer::{MetricSynthesizer, SynthesisBounds, SynthesizedMetrics};

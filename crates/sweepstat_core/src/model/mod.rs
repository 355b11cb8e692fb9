mod results;
mod source;
mod value;

pub(crate) use value::NULL;

pub use results::{PlayerMetrics, PlayerMetricsMap, RunConfig, ScoreBreakdown, SimulationResult};
pub use source::{FieldSource, get, scalar_entries};
pub use value::{FieldValue, GroupKey};

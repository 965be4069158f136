use crate::bucket::TimeMS;

/// Marker for the deserialized settings a model is built from.
pub trait ModelSettings {}

/// A model that is configured once from its settings.
pub trait Model {
    type Settings: ModelSettings;
    fn with_settings(settings: &Self::Settings) -> Self;
}

/// A model held by the bucket that follows the simulation clock.
pub trait BucketModel {
    fn init(&mut self, step: TimeMS);
    fn before_agent_step(&mut self, step: TimeMS);
}

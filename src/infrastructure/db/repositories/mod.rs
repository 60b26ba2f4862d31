mod model_configs;
mod training_examples;

pub use model_configs::ModelConfigRepository;
pub use training_examples::TrainingExampleRepository;

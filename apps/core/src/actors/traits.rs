use crate::brain::catalog::Category;
use crate::error::AppError;
use crate::models::MoodReading;
use async_trait::async_trait;

/// Defines the public interface for a pluggable emotion model.
///
/// Loading may be slow (weights on disk, a remote warm-up), so it is async and
/// driven in the background by `ModelEstimator`. Inference must be cheap and
/// synchronous: it runs inside a conversation turn.
#[async_trait]
pub trait EmotionModel: Send + Sync + 'static {
    /// Human-readable model name, used in logs.
    fn name(&self) -> &str;

    /// Prepares the model. Called once.
    async fn load(&self) -> Result<(), AppError>;

    /// Mood and stress for a message, `None` when the model has no opinion.
    fn infer(&self, text: &str, category: Category) -> Option<MoodReading>;
}

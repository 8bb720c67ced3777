// Swipe review: queue reads, swipes, undo and the feedback-driven
// re-score-then-rerank loop.

pub mod feedback;
pub mod handlers;
pub mod repository;

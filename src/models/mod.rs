pub mod task;

// Re-export core models for easy access
pub use task::Task;

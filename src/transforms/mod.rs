pub mod visma;

pub use visma::VismaJobPostingTransform;

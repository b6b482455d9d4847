pub mod column;
pub mod expression;
pub mod pipeline;
pub mod render;

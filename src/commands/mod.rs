pub mod evaluate;
pub mod judge;
pub mod patterns;
pub mod qrels;
mod session;

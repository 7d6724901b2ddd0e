pub mod ids;
pub mod project;
pub mod task;
pub mod task_tree;
pub mod user;

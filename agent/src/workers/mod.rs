pub mod heartbeat;
pub mod task_queue;
pub mod tasks;

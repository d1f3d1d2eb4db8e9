// Core splitting engine
pub mod child_orders;
pub mod cut_preview;
pub mod cuts;
pub mod execution_ledger;
pub mod lines;
pub mod order_status;

// Supporting services
pub mod notifications;
pub mod work_orders;

pub mod billing_cut;
pub mod billing_cut_detail;
pub mod execution_entry;
pub mod order_item;
pub mod outbox_notification;
pub mod service_line;
pub mod service_line_item;
pub mod work_order;

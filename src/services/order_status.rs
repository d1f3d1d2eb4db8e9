use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait};
use strum::{Display, EnumString};
use tracing::{info, instrument};

use crate::entities::work_order::{ActiveModel as WorkOrderActiveModel, Model as WorkOrderModel};
use crate::errors::ServiceError;

/// Split status of a work order: whether its contracted quantity has
/// been fully cut. Orthogonal to the business workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SplitStatus {
    Active,
    Partial,
    Closed,
    Canceled,
}

/// Business workflow status of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum WorkStatus {
    Generated,
    Assigned,
    InProgress,
    Completed,
    ClientAuthorized,
    Invoiced,
    Delivered,
    Canceled,
}

impl WorkStatus {
    /// Statuses past the billing hand-off. Closing out a cut never
    /// downgrades these.
    pub fn is_billing_terminal(&self) -> bool {
        matches!(
            self,
            WorkStatus::ClientAuthorized | WorkStatus::Invoiced | WorkStatus::Delivered
        )
    }
}

/// Applies the lifecycle side effects of a committed cut to the parent
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStatusCoordinator;

impl OrderStatusCoordinator {
    /// Split-status transition table. Forward-only: `partial` and
    /// `closed` never regress to `active`, `canceled` is untouched.
    pub fn next_split_status(
        current: SplitStatus,
        spawned_child: bool,
        remainder_exists: bool,
    ) -> SplitStatus {
        match current {
            SplitStatus::Active | SplitStatus::Partial => {
                if spawned_child {
                    SplitStatus::Partial
                } else if !remainder_exists {
                    SplitStatus::Closed
                } else {
                    current
                }
            }
            other => other,
        }
    }

    /// Updates the parent order after a cut has been written: advances
    /// the split status, marks the business status completed (unless it
    /// already moved past billing), and initializes the quality result
    /// the first time only.
    #[instrument(skip(self, conn, order), fields(order_id = %order.id))]
    pub async fn close_out_cut<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: &WorkOrderModel,
        spawned_child: bool,
        remainder_exists: bool,
    ) -> Result<WorkOrderModel, ServiceError> {
        let current: SplitStatus = order.split_status.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "work order {} has unknown split status '{}'",
                order.id, order.split_status
            ))
        })?;
        let work_status: WorkStatus = order.status.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "work order {} has unknown status '{}'",
                order.id, order.status
            ))
        })?;

        let next = Self::next_split_status(current, spawned_child, remainder_exists);

        let mut active: WorkOrderActiveModel = order.clone().into();
        active.split_status = Set(next.to_string());
        if !work_status.is_billing_terminal() {
            active.status = Set(WorkStatus::Completed.to_string());
        }
        if order.quality_result.is_none() {
            active.quality_result = Set(Some("pending".to_string()));
        }
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(order.version + 1);

        let updated = active.update(conn).await?;
        info!(
            split_status = %next,
            status = %updated.status,
            "work order closed out after cut"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_status_string_round_trip() {
        for status in [
            SplitStatus::Active,
            SplitStatus::Partial,
            SplitStatus::Closed,
            SplitStatus::Canceled,
        ] {
            let parsed: SplitStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(SplitStatus::Partial.to_string(), "partial");
    }

    #[test]
    fn active_moves_to_partial_when_child_spawned() {
        assert_eq!(
            OrderStatusCoordinator::next_split_status(SplitStatus::Active, true, true),
            SplitStatus::Partial
        );
    }

    #[test]
    fn active_moves_to_closed_without_remainder() {
        assert_eq!(
            OrderStatusCoordinator::next_split_status(SplitStatus::Active, false, false),
            SplitStatus::Closed
        );
    }

    #[test]
    fn active_stays_active_when_remainder_kept_on_order() {
        // spawn_child = false with a remainder leaves the order cuttable
        assert_eq!(
            OrderStatusCoordinator::next_split_status(SplitStatus::Active, false, true),
            SplitStatus::Active
        );
    }

    #[test]
    fn partial_closes_once_everything_is_cut() {
        assert_eq!(
            OrderStatusCoordinator::next_split_status(SplitStatus::Partial, false, false),
            SplitStatus::Closed
        );
    }

    #[test]
    fn closed_and_canceled_never_change() {
        assert_eq!(
            OrderStatusCoordinator::next_split_status(SplitStatus::Closed, true, true),
            SplitStatus::Closed
        );
        assert_eq!(
            OrderStatusCoordinator::next_split_status(SplitStatus::Canceled, false, false),
            SplitStatus::Canceled
        );
    }

    #[test]
    fn billing_terminal_statuses_are_protected() {
        assert!(WorkStatus::ClientAuthorized.is_billing_terminal());
        assert!(WorkStatus::Invoiced.is_billing_terminal());
        assert!(WorkStatus::Delivered.is_billing_terminal());
        assert!(!WorkStatus::InProgress.is_billing_terminal());
        assert!(!WorkStatus::Completed.is_billing_terminal());
    }
}

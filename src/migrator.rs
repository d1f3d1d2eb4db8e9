// The `MigrationTrait::up`/`down` signatures take `&SchemaManager` with a
// late-bound elided lifetime; writing `&SchemaManager<'_>` makes it early-bound
// and fails to match the trait (E0195). Allow the idiom lint here only.
#![allow(elided_lifetimes_in_paths)]

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_work_orders_tables::Migration),
            Box::new(m20240115_000002_create_execution_entries_table::Migration),
            Box::new(m20240115_000003_create_billing_cuts_tables::Migration),
            Box::new(m20240115_000004_create_outbox_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240115_000001_create_work_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000001_create_work_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // work_orders table aligned with entities::work_order Model
            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrders::Folio).string().not_null())
                        .col(ColumnDef::new(WorkOrders::SiteId).uuid().not_null())
                        .col(ColumnDef::new(WorkOrders::AreaId).uuid().null())
                        .col(ColumnDef::new(WorkOrders::ServiceTypeId).uuid().null())
                        .col(ColumnDef::new(WorkOrders::TeamLeadId).uuid().null())
                        .col(ColumnDef::new(WorkOrders::Description).string().null())
                        .col(ColumnDef::new(WorkOrders::Status).string().not_null())
                        .col(ColumnDef::new(WorkOrders::SplitStatus).string().not_null())
                        .col(ColumnDef::new(WorkOrders::QualityResult).string().null())
                        .col(ColumnDef::new(WorkOrders::ParentOrderId).uuid().null())
                        .col(
                            ColumnDef::new(WorkOrders::SplitIndex)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::Tax)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(WorkOrders::CreatedBy).uuid().null())
                        .col(ColumnDef::new(WorkOrders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(WorkOrders::UpdatedAt).timestamp().null())
                        .col(
                            ColumnDef::new(WorkOrders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_folio")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::Folio)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_parent_order_id")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::ParentOrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_split_status")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::SplitStatus)
                        .to_owned(),
                )
                .await?;

            // service_lines: multi-service representation
            manager
                .create_table(
                    Table::create()
                        .table(ServiceLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceLines::OrderId).uuid().not_null())
                        .col(ColumnDef::new(ServiceLines::Concept).string().not_null())
                        .col(
                            ColumnDef::new(ServiceLines::ContractedQty)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceLines::UnitPrice).decimal().not_null())
                        .col(
                            ColumnDef::new(ServiceLines::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ServiceLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_lines_order_id")
                        .table(ServiceLines::Table)
                        .col(ServiceLines::OrderId)
                        .to_owned(),
                )
                .await?;

            // service_line_items: sub-items of a service line
            manager
                .create_table(
                    Table::create()
                        .table(ServiceLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceLineItems::ServiceLineId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceLineItems::Description)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceLineItems::PlannedQty)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceLineItems::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ServiceLineItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_line_items_service_line_id")
                        .table(ServiceLineItems::Table)
                        .col(ServiceLineItems::ServiceLineId)
                        .to_owned(),
                )
                .await?;

            // order_items: legacy single-item representation
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Description).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::ContractedQty)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ServiceLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ServiceLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum WorkOrders {
        Table,
        Id,
        Folio,
        SiteId,
        AreaId,
        ServiceTypeId,
        TeamLeadId,
        Description,
        Status,
        SplitStatus,
        QualityResult,
        ParentOrderId,
        SplitIndex,
        Subtotal,
        Tax,
        Total,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    pub(super) enum ServiceLines {
        Table,
        Id,
        OrderId,
        Concept,
        ContractedQty,
        UnitPrice,
        Position,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ServiceLineItems {
        Table,
        Id,
        ServiceLineId,
        Description,
        PlannedQty,
        Position,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderItems {
        Table,
        Id,
        OrderId,
        Description,
        ContractedQty,
        UnitPrice,
        CreatedAt,
    }
}

mod m20240115_000002_create_execution_entries_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000002_create_execution_entries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Append-only progress ledger, written by the progress-reporting
            // subsystem. This service only reads aggregates from it.
            manager
                .create_table(
                    Table::create()
                        .table(ExecutionEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ExecutionEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExecutionEntries::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(ExecutionEntries::ServiceLineId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(ExecutionEntries::OrderItemId).uuid().null())
                        .col(
                            ColumnDef::new(ExecutionEntries::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExecutionEntries::UnitPriceSnapshot)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExecutionEntries::ReportedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExecutionEntries::ReportedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExecutionEntries::RequestId)
                                .uuid()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_execution_entries_service_line_id")
                        .table(ExecutionEntries::Table)
                        .col(ExecutionEntries::ServiceLineId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_execution_entries_order_item_id")
                        .table(ExecutionEntries::Table)
                        .col(ExecutionEntries::OrderItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_execution_entries_request_id")
                        .table(ExecutionEntries::Table)
                        .col(ExecutionEntries::RequestId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ExecutionEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ExecutionEntries {
        Table,
        Id,
        OrderId,
        ServiceLineId,
        OrderItemId,
        Quantity,
        UnitPriceSnapshot,
        ReportedBy,
        ReportedAt,
        RequestId,
    }
}

mod m20240115_000003_create_billing_cuts_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000003_create_billing_cuts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BillingCuts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BillingCuts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BillingCuts::OrderId).uuid().not_null())
                        .col(ColumnDef::new(BillingCuts::Folio).string().not_null())
                        .col(ColumnDef::new(BillingCuts::PeriodStart).date().not_null())
                        .col(ColumnDef::new(BillingCuts::PeriodEnd).date().not_null())
                        .col(ColumnDef::new(BillingCuts::Status).string().not_null())
                        .col(
                            ColumnDef::new(BillingCuts::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(BillingCuts::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(BillingCuts::ChildOrderId).uuid().null())
                        .col(ColumnDef::new(BillingCuts::RequestId).uuid().null())
                        .col(ColumnDef::new(BillingCuts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(BillingCuts::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_billing_cuts_folio")
                        .table(BillingCuts::Table)
                        .col(BillingCuts::Folio)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_billing_cuts_order_id")
                        .table(BillingCuts::Table)
                        .col(BillingCuts::OrderId)
                        .to_owned(),
                )
                .await?;

            // Idempotency key for duplicate CreateCut submissions.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_billing_cuts_request_id")
                        .table(BillingCuts::Table)
                        .col(BillingCuts::RequestId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BillingCutDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BillingCutDetails::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BillingCutDetails::CutId).uuid().not_null())
                        .col(
                            ColumnDef::new(BillingCutDetails::ServiceLineId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(BillingCutDetails::OrderItemId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(BillingCutDetails::Concept)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BillingCutDetails::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BillingCutDetails::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BillingCutDetails::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BillingCutDetails::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_billing_cut_details_cut_id")
                        .table(BillingCutDetails::Table)
                        .col(BillingCutDetails::CutId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_billing_cut_details_service_line_id")
                        .table(BillingCutDetails::Table)
                        .col(BillingCutDetails::ServiceLineId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_billing_cut_details_order_item_id")
                        .table(BillingCutDetails::Table)
                        .col(BillingCutDetails::OrderItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BillingCutDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BillingCuts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum BillingCuts {
        Table,
        Id,
        OrderId,
        Folio,
        PeriodStart,
        PeriodEnd,
        Status,
        TotalAmount,
        CreatedBy,
        ChildOrderId,
        RequestId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum BillingCutDetails {
        Table,
        Id,
        CutId,
        ServiceLineId,
        OrderItemId,
        Concept,
        Quantity,
        UnitPrice,
        Amount,
        CreatedAt,
    }
}

mod m20240115_000004_create_outbox_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000004_create_outbox_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OutboxNotifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutboxNotifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboxNotifications::RecipientRole)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(OutboxNotifications::SiteId).uuid().null())
                        .col(ColumnDef::new(OutboxNotifications::UserId).uuid().null())
                        .col(ColumnDef::new(OutboxNotifications::Title).string().not_null())
                        .col(
                            ColumnDef::new(OutboxNotifications::Message)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboxNotifications::Link).string().null())
                        .col(
                            ColumnDef::new(OutboxNotifications::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboxNotifications::Attempts)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OutboxNotifications::ErrorMessage)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OutboxNotifications::AvailableAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboxNotifications::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboxNotifications::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbox_notifications_status")
                        .table(OutboxNotifications::Table)
                        .col(OutboxNotifications::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OutboxNotifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OutboxNotifications {
        Table,
        Id,
        RecipientRole,
        SiteId,
        UserId,
        Title,
        Message,
        Link,
        Status,
        Attempts,
        ErrorMessage,
        AvailableAt,
        CreatedAt,
        UpdatedAt,
    }
}

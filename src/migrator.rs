use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_profiles_table::Migration),
            Box::new(m20240101_000002_create_quotation_tables::Migration),
            Box::new(m20240101_000003_create_job_orders_table::Migration),
            Box::new(m20240101_000004_create_sampling_assignments_table::Migration),
            Box::new(m20240101_000005_create_travel_orders_table::Migration),
            Box::new(m20240101_000006_create_document_sequences_table::Migration),
        ]
    }
}

mod m20240101_000001_create_profiles_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_profiles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Profiles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Profiles::FullName).string().not_null())
                        .col(
                            ColumnDef::new(Profiles::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Profiles::Role).string_len(32).not_null())
                        .col(ColumnDef::new(Profiles::Phone).string().null())
                        .col(ColumnDef::new(Profiles::CompanyName).string().null())
                        .col(
                            ColumnDef::new(Profiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Profiles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_profiles_role")
                        .table(Profiles::Table)
                        .col(Profiles::Role)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Profiles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Profiles {
        Table,
        Id,
        FullName,
        Email,
        Role,
        Phone,
        CompanyName,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_quotation_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_quotation_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Quotations::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Quotations::QuotationNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Quotations::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Quotations::Title).string().not_null())
                        .col(ColumnDef::new(Quotations::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Quotations::PerdiemPrice)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::PerdiemQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::TransportPrice)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::TransportQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::Subtotal)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::TaxRate)
                                .decimal_len(9, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::TaxAmount)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::DiscountAmount)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::TotalAmount)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Quotations::ValidUntil).date().null())
                        .col(ColumnDef::new(Quotations::Notes).text().null())
                        .col(ColumnDef::new(Quotations::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Quotations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotations_client")
                                .from(Quotations::Table, Quotations::ClientId)
                                .to(Profiles::Table, Profiles::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotations_client_id")
                        .table(Quotations::Table)
                        .col(Quotations::ClientId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotations_status")
                        .table(Quotations::Table)
                        .col(Quotations::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QuotationItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(QuotationItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::QuotationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::Position)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::Parameter)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuotationItems::SampleType).string().null())
                        .col(ColumnDef::new(QuotationItems::Regulation).string().null())
                        .col(
                            ColumnDef::new(QuotationItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::TotalPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotation_items_quotation")
                                .from(QuotationItems::Table, QuotationItems::QuotationId)
                                .to(Quotations::Table, Quotations::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotation_items_quotation_id")
                        .table(QuotationItems::Table)
                        .col(QuotationItems::QuotationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuotationItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Quotations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Profiles {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Quotations {
        Table,
        Id,
        QuotationNumber,
        ClientId,
        Title,
        Status,
        PerdiemPrice,
        PerdiemQuantity,
        TransportPrice,
        TransportQuantity,
        Subtotal,
        TaxRate,
        TaxAmount,
        DiscountAmount,
        TotalAmount,
        ValidUntil,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum QuotationItems {
        Table,
        Id,
        QuotationId,
        Position,
        Parameter,
        SampleType,
        Regulation,
        Quantity,
        UnitPrice,
        TotalPrice,
        CreatedAt,
    }
}

mod m20240101_000003_create_job_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_job_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(JobOrders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(JobOrders::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(JobOrders::JobNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(JobOrders::QuotationId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(JobOrders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(JobOrders::ScheduledDate).date().null())
                        .col(ColumnDef::new(JobOrders::Notes).text().null())
                        .col(
                            ColumnDef::new(JobOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(JobOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_job_orders_quotation")
                                .from(JobOrders::Table, JobOrders::QuotationId)
                                .to(Quotations::Table, Quotations::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_job_orders_status")
                        .table(JobOrders::Table)
                        .col(JobOrders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(JobOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Quotations {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum JobOrders {
        Table,
        Id,
        JobNumber,
        QuotationId,
        Status,
        ScheduledDate,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_sampling_assignments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_sampling_assignments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SamplingAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SamplingAssignments::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(SamplingAssignments::JobOrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(SamplingAssignments::FieldOfficerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SamplingAssignments::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(SamplingAssignments::PlannedDate).date().null())
                        .col(
                            ColumnDef::new(SamplingAssignments::ActualDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(SamplingAssignments::Location).string().null())
                        .col(ColumnDef::new(SamplingAssignments::Notes).text().null())
                        .col(ColumnDef::new(SamplingAssignments::Photos).json().not_null())
                        .col(
                            ColumnDef::new(SamplingAssignments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SamplingAssignments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sampling_assignments_job_order")
                                .from(SamplingAssignments::Table, SamplingAssignments::JobOrderId)
                                .to(JobOrders::Table, JobOrders::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sampling_assignments_field_officer")
                                .from(
                                    SamplingAssignments::Table,
                                    SamplingAssignments::FieldOfficerId,
                                )
                                .to(Profiles::Table, Profiles::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sampling_assignments_field_officer_id")
                        .table(SamplingAssignments::Table)
                        .col(SamplingAssignments::FieldOfficerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SamplingAssignments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Profiles {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum JobOrders {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum SamplingAssignments {
        Table,
        Id,
        JobOrderId,
        FieldOfficerId,
        Status,
        PlannedDate,
        ActualDate,
        Location,
        Notes,
        Photos,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_travel_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_travel_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TravelOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TravelOrders::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::SamplingAssignmentId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::DocumentNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(TravelOrders::Destination).string().not_null())
                        .col(ColumnDef::new(TravelOrders::Purpose).text().not_null())
                        .col(ColumnDef::new(TravelOrders::DepartureDate).date().not_null())
                        .col(ColumnDef::new(TravelOrders::ReturnDate).date().not_null())
                        .col(
                            ColumnDef::new(TravelOrders::TransportBudget)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::AccommodationBudget)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::DailyAllowance)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::OtherBudget)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::TotalBudget)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(TravelOrders::Notes).text().null())
                        .col(ColumnDef::new(TravelOrders::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(TravelOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TravelOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_travel_orders_sampling_assignment")
                                .from(TravelOrders::Table, TravelOrders::SamplingAssignmentId)
                                .to(SamplingAssignments::Table, SamplingAssignments::Id),
                        )
                        .to_owned(),
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TravelOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SamplingAssignments {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum TravelOrders {
        Table,
        Id,
        SamplingAssignmentId,
        DocumentNumber,
        Destination,
        Purpose,
        DepartureDate,
        ReturnDate,
        TransportBudget,
        AccommodationBudget,
        DailyAllowance,
        OtherBudget,
        TotalBudget,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_document_sequences_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_document_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentSequences::Scope)
                                .string_len(64)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DocumentSequences::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DocumentSequences::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DocumentSequences {
        Table,
        Scope,
        LastValue,
        UpdatedAt,
    }
}

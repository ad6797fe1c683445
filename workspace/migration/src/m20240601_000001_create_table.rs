use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string_null(Users::AccessToken))
                    .to_owned(),
            )
            .await?;

        // Create bank_accounts table
        manager
            .create_table(
                Table::create()
                    .table(BankAccounts::Table)
                    .if_not_exists()
                    .col(pk_auto(BankAccounts::Id))
                    .col(integer(BankAccounts::OwnerId))
                    .col(string(BankAccounts::BankName))
                    .col(string_null(BankAccounts::AccountName))
                    .col(string(BankAccounts::ExternalId).unique_key())
                    .col(string_len(BankAccounts::Kind, 20))
                    .col(string(BankAccounts::Balance))
                    .col(string(BankAccounts::CurrencyCode))
                    .col(boolean(BankAccounts::IsActive).default(true))
                    .col(timestamp_with_time_zone(BankAccounts::LastSynced))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_account_owner")
                            .from(BankAccounts::Table, BankAccounts::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::OwnerId))
                    .col(integer(Transactions::AccountId))
                    .col(string(Transactions::Name))
                    .col(decimal_len(Transactions::Amount, 16, 4))
                    .col(date(Transactions::Date))
                    .col(string_null(Transactions::Category))
                    .col(boolean(Transactions::IsReceived).default(false))
                    .col(string(Transactions::ExternalId).unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_owner")
                            .from(Transactions::Table, Transactions::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_account")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(BankAccounts::Table, BankAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for the per-user existing-ID load during sync.
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_owner_date")
                    .table(Transactions::Table)
                    .col(Transactions::OwnerId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        // Create sync_cursors table
        manager
            .create_table(
                Table::create()
                    .table(SyncCursors::Table)
                    .if_not_exists()
                    .col(pk_auto(SyncCursors::Id))
                    .col(integer(SyncCursors::UserId).unique_key())
                    .col(string(SyncCursors::Cursor))
                    .col(timestamp_with_time_zone(SyncCursors::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_cursor_user")
                            .from(SyncCursors::Table, SyncCursors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncCursors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    AccessToken,
}

#[derive(DeriveIden)]
enum BankAccounts {
    Table,
    Id,
    OwnerId,
    BankName,
    AccountName,
    ExternalId,
    Kind,
    Balance,
    CurrencyCode,
    IsActive,
    LastSynced,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    OwnerId,
    AccountId,
    Name,
    Amount,
    Date,
    Category,
    IsReceived,
    ExternalId,
}

#[derive(DeriveIden)]
enum SyncCursors {
    Table,
    Id,
    UserId,
    Cursor,
    UpdatedAt,
}

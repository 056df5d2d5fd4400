//! Initial schema migration - creates all tables from scratch.
//!
//! - `families`: household boundary
//! - `users`: parents and children of a family
//! - `tasks`: chore templates, optionally recurring
//! - `task_assignments`: one occurrence of a task for one child
//! - `wallets`: cached coin balance per child
//! - `wallet_transactions`: append-only coin ledger
//! - `user_xp`: level and XP per child
//! - `badges` / `user_badges`: badge catalog and one-time unlocks
//! - `rewards` / `redemptions`: family marketplace
//! - `notifications`: stored inbox

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Families {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    FamilyId,
    Role,
    DisplayName,
    CreatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    FamilyId,
    CreatedBy,
    Title,
    Description,
    CoinValue,
    XpValue,
    Category,
    Status,
    RecurrenceKind,
    RecurrenceDays,
    RecurrenceEndDate,
    CreatedAt,
}

#[derive(Iden)]
enum TaskAssignments {
    Table,
    Id,
    TaskId,
    ChildId,
    Status,
    CreatedAt,
    CompletedAt,
    ApprovedAt,
    ApprovedBy,
    RejectionReason,
}

#[derive(Iden)]
enum Wallets {
    Table,
    ChildId,
    Balance,
    TotalEarned,
    TotalSpent,
    UpdatedAt,
}

#[derive(Iden)]
enum WalletTransactions {
    Table,
    Id,
    ChildId,
    Kind,
    Amount,
    BalanceAfter,
    Reason,
    ReferenceKind,
    ReferenceId,
    CreatedAt,
}

#[derive(Iden)]
enum UserXp {
    Table,
    UserId,
    CurrentLevel,
    CurrentXp,
    TotalXp,
    LastLevelUpAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Badges {
    Table,
    Id,
    Name,
    Description,
    Icon,
    ConditionKind,
    ConditionThreshold,
}

#[derive(Iden)]
enum UserBadges {
    Table,
    UserId,
    BadgeId,
    UnlockedAt,
}

#[derive(Iden)]
enum Rewards {
    Table,
    Id,
    FamilyId,
    CreatedBy,
    Name,
    Description,
    CoinCost,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum Redemptions {
    Table,
    Id,
    RewardId,
    ChildId,
    Status,
    CoinAmount,
    CreatedAt,
    ReviewedAt,
    ReviewedBy,
    RejectionReason,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    Title,
    Body,
    ReferenceKind,
    ReferenceId,
    Read,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Families and users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Families::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Families::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Families::Name).string().not_null())
                    .col(
                        ColumnDef::new(Families::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-users-family_id")
                            .from(Users::Table, Users::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-family_id-role")
                    .table(Users::Table)
                    .col(Users::FamilyId)
                    .col(Users::Role)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Tasks and assignments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(Tasks::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).string())
                    .col(ColumnDef::new(Tasks::CoinValue).big_integer().not_null())
                    .col(ColumnDef::new(Tasks::XpValue).big_integer().not_null())
                    .col(ColumnDef::new(Tasks::Category).string().not_null())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Tasks::RecurrenceKind).string())
                    .col(ColumnDef::new(Tasks::RecurrenceDays).string())
                    .col(ColumnDef::new(Tasks::RecurrenceEndDate).date())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tasks-family_id")
                            .from(Tasks::Table, Tasks::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tasks-created_by")
                            .from(Tasks::Table, Tasks::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tasks-family_id")
                    .table(Tasks::Table)
                    .col(Tasks::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tasks-status-recurrence_kind")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .col(Tasks::RecurrenceKind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaskAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskAssignments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskAssignments::TaskId).uuid().not_null())
                    .col(ColumnDef::new(TaskAssignments::ChildId).uuid().not_null())
                    .col(ColumnDef::new(TaskAssignments::Status).string().not_null())
                    .col(
                        ColumnDef::new(TaskAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaskAssignments::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskAssignments::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskAssignments::ApprovedBy).uuid())
                    .col(ColumnDef::new(TaskAssignments::RejectionReason).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-task_assignments-task_id")
                            .from(TaskAssignments::Table, TaskAssignments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-task_assignments-child_id")
                            .from(TaskAssignments::Table, TaskAssignments::ChildId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Serves the scheduler's "already created today" lookup.
        manager
            .create_index(
                Index::create()
                    .name("idx-task_assignments-task_id-child_id-created_at")
                    .table(TaskAssignments::Table)
                    .col(TaskAssignments::TaskId)
                    .col(TaskAssignments::ChildId)
                    .col(TaskAssignments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-task_assignments-child_id-status")
                    .table(TaskAssignments::Table)
                    .col(TaskAssignments::ChildId)
                    .col(TaskAssignments::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Wallets and ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::ChildId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::TotalEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::TotalSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-wallets-child_id")
                            .from(Wallets::Table, Wallets::ChildId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalletTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletTransactions::ChildId).uuid().not_null())
                    .col(ColumnDef::new(WalletTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(WalletTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletTransactions::Reason).string().not_null())
                    .col(ColumnDef::new(WalletTransactions::ReferenceKind).string())
                    .col(ColumnDef::new(WalletTransactions::ReferenceId).uuid())
                    .col(
                        ColumnDef::new(WalletTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-wallet_transactions-child_id")
                            .from(WalletTransactions::Table, WalletTransactions::ChildId)
                            .to(Wallets::Table, Wallets::ChildId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallet_transactions-child_id-created_at")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::ChildId)
                    .col(WalletTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. XP and badges
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(UserXp::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserXp::UserId).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(UserXp::CurrentLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(UserXp::CurrentXp)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserXp::TotalXp)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserXp::LastLevelUpAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(UserXp::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_xp-user_id")
                            .from(UserXp::Table, UserXp::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Badges::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Badges::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Badges::Name).string().not_null())
                    .col(ColumnDef::new(Badges::Description).string().not_null())
                    .col(ColumnDef::new(Badges::Icon).string())
                    .col(ColumnDef::new(Badges::ConditionKind).string().not_null())
                    .col(
                        ColumnDef::new(Badges::ConditionThreshold)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-badges-name-unique")
                    .table(Badges::Table)
                    .col(Badges::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // The composite key is what makes an unlock happen at most once.
        manager
            .create_table(
                Table::create()
                    .table(UserBadges::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserBadges::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserBadges::BadgeId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserBadges::UnlockedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserBadges::UserId)
                            .col(UserBadges::BadgeId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_badges-user_id")
                            .from(UserBadges::Table, UserBadges::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_badges-badge_id")
                            .from(UserBadges::Table, UserBadges::BadgeId)
                            .to(Badges::Table, Badges::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Rewards and redemptions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rewards::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rewards::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(Rewards::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Rewards::Name).string().not_null())
                    .col(ColumnDef::new(Rewards::Description).string())
                    .col(ColumnDef::new(Rewards::CoinCost).big_integer().not_null())
                    .col(
                        ColumnDef::new(Rewards::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Rewards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-rewards-family_id")
                            .from(Rewards::Table, Rewards::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-rewards-family_id")
                    .table(Rewards::Table)
                    .col(Rewards::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Redemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Redemptions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Redemptions::RewardId).uuid().not_null())
                    .col(ColumnDef::new(Redemptions::ChildId).uuid().not_null())
                    .col(ColumnDef::new(Redemptions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Redemptions::CoinAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Redemptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Redemptions::ReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Redemptions::ReviewedBy).uuid())
                    .col(ColumnDef::new(Redemptions::RejectionReason).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-redemptions-reward_id")
                            .from(Redemptions::Table, Redemptions::RewardId)
                            .to(Rewards::Table, Rewards::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-redemptions-child_id")
                            .from(Redemptions::Table, Redemptions::ChildId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-redemptions-child_id-status")
                    .table(Redemptions::Table)
                    .col(Redemptions::ChildId)
                    .col(Redemptions::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Notifications
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string().not_null())
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Body).string().not_null())
                    .col(ColumnDef::new(Notifications::ReferenceKind).string())
                    .col(ColumnDef::new(Notifications::ReferenceId).uuid())
                    .col(
                        ColumnDef::new(Notifications::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-notifications-user_id")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-notifications-user_id-read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::Read)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Redemptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rewards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserBadges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Badges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserXp::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalletTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Families::Table).to_owned())
            .await?;
        Ok(())
    }
}

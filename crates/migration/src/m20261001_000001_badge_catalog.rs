//! Seed the badge catalog.

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

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

/// (name, description, icon, condition kind, threshold)
const CATALOG: [(&str, &str, &str, &str, i64); 8] = [
    ("First Task", "Get your first task approved", "star", "tasks_approved", 1),
    ("Hard Worker", "Get 10 tasks approved", "hammer", "tasks_approved", 10),
    ("Rising Star", "Reach level 5", "rocket", "level", 5),
    ("Legend", "Reach the top level", "crown", "level", 10),
    ("XP Hunter", "Collect 1000 XP", "target", "total_xp", 1000),
    ("On Fire", "Get a task approved 3 days in a row", "flame", "streak_days", 3),
    ("Week Warrior", "Get a task approved 7 days in a row", "calendar", "streak_days", 7),
    ("Millionaire", "Earn 1000 coins in total", "coins", "coins_earned", 1000),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        let mut stmt = Query::insert()
            .into_table(Badges::Table)
            .columns([
                Badges::Id,
                Badges::Name,
                Badges::Description,
                Badges::Icon,
                Badges::ConditionKind,
                Badges::ConditionThreshold,
            ])
            .to_owned();
        for (name, description, icon, kind, threshold) in CATALOG {
            stmt.values_panic([
                Uuid::new_v4().into(),
                name.into(),
                description.into(),
                icon.into(),
                kind.into(),
                threshold.into(),
            ]);
        }

        db.execute(backend.build(&stmt)).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();
        let stmt = Query::delete()
            .from_table(Badges::Table)
            .and_where(Expr::col(Badges::Name).is_in(CATALOG.iter().map(|(name, ..)| *name)))
            .to_owned();
        db.execute(backend.build(&stmt)).await?;
        Ok(())
    }
}

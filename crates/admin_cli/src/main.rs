use std::error::Error;

use chrono::{NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use engine::{Engine, NewRewardCmd, NewTaskCmd, Recurrence, Role, TaskCategory};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "coinquest_admin")]
#[command(about = "Admin utilities for CoinQuest (bootstrap families, users, tasks, rewards)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./coinquest.db?mode=rwc"
    )]
    database_url: String,

    /// Print listings as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Family(Family),
    Parent(Parent),
    Child(Child),
    Task(Task),
    Reward(Reward),
    Scheduler(Scheduler),
    /// Print the badge catalog.
    Badges,
}

#[derive(Args, Debug)]
struct Family {
    #[command(subcommand)]
    command: FamilyCommand,
}

#[derive(Subcommand, Debug)]
enum FamilyCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    /// List the members of a family.
    Members {
        #[arg(long)]
        family: Uuid,
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
}

#[derive(Args, Debug)]
struct Parent {
    #[command(subcommand)]
    command: ParentCommand,
}

#[derive(Subcommand, Debug)]
enum ParentCommand {
    Create {
        #[arg(long)]
        family: Uuid,
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct Child {
    #[command(subcommand)]
    command: ChildCommand,
}

#[derive(Subcommand, Debug)]
enum ChildCommand {
    Create {
        /// Parent creating the child; the child joins their family.
        #[arg(long)]
        parent: Uuid,
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct Task {
    #[command(subcommand)]
    command: TaskCommand,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    Create(TaskCreateArgs),
}

#[derive(Args, Debug)]
struct TaskCreateArgs {
    #[arg(long)]
    parent: Uuid,
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    coins: i64,
    #[arg(long)]
    xp: i64,
    #[arg(long, value_parser = parse_category, default_value = "other")]
    category: TaskCategory,
    /// Repeat every day.
    #[arg(long, conflicts_with = "weekly")]
    daily: bool,
    /// Repeat on these weekdays (e.g. `mon,thu`).
    #[arg(long, value_delimiter = ',')]
    weekly: Vec<Weekday>,
    /// Last day the task repeats (YYYY-MM-DD).
    #[arg(long)]
    until: Option<NaiveDate>,
    /// Child to assign; repeat the flag for several children.
    #[arg(long = "child")]
    children: Vec<Uuid>,
}

#[derive(Args, Debug)]
struct Reward {
    #[command(subcommand)]
    command: RewardCommand,
}

#[derive(Subcommand, Debug)]
enum RewardCommand {
    Create {
        #[arg(long)]
        parent: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cost: i64,
    },
}

#[derive(Args, Debug)]
struct Scheduler {
    #[command(subcommand)]
    command: SchedulerCommand,
}

#[derive(Subcommand, Debug)]
enum SchedulerCommand {
    /// Generate today's recurring assignments once.
    Run {
        #[arg(long, default_value = "UTC")]
        timezone: Tz,
    },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::try_from(raw).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> Result<TaskCategory, String> {
    TaskCategory::try_from(raw).map_err(|err| err.to_string())
}

fn recurrence(args: &TaskCreateArgs) -> Option<Recurrence> {
    let rule = if args.daily {
        Recurrence::daily()
    } else if !args.weekly.is_empty() {
        Recurrence::weekly(args.weekly.iter().copied())
    } else {
        return None;
    };
    Some(match args.until {
        Some(end) => rule.until(end),
        None => rule,
    })
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Family(Family {
            command: FamilyCommand::Create { name },
        }) => {
            let family = engine.create_family(&name).await?;
            println!("created family: {} ({})", family.name, family.id);
        }
        Command::Family(Family {
            command: FamilyCommand::Members { family, role },
        }) => {
            let members = engine.family_members(family, role).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&members)?);
            } else {
                for user in members {
                    println!("{}\t{}\t{}", user.id, user.role.as_str(), user.display_name);
                }
            }
        }
        Command::Parent(Parent {
            command: ParentCommand::Create { family, name },
        }) => {
            let parent = engine.create_parent(family, &name).await?;
            println!("created parent: {} ({})", parent.display_name, parent.id);
        }
        Command::Child(Child {
            command: ChildCommand::Create { parent, name },
        }) => {
            let child = engine.create_child(parent, &name).await?;
            println!("created child: {} ({})", child.display_name, child.id);
        }
        Command::Task(Task {
            command: TaskCommand::Create(args),
        }) => {
            let mut cmd = NewTaskCmd::new(args.parent, &args.title, args.coins, args.xp)
                .category(args.category);
            if let Some(description) = &args.description {
                cmd = cmd.description(description);
            }
            if let Some(rule) = recurrence(&args) {
                cmd = cmd.recurrence(rule);
            }
            for child in &args.children {
                cmd = cmd.assign_to(*child);
            }
            let (task, assignments) = engine.create_task(cmd).await?;
            println!(
                "created task: {} ({}), {} assignment(s)",
                task.title,
                task.id,
                assignments.len()
            );
        }
        Command::Reward(Reward {
            command:
                RewardCommand::Create {
                    parent,
                    name,
                    description,
                    cost,
                },
        }) => {
            let mut cmd = NewRewardCmd::new(parent, name, cost);
            if let Some(description) = description {
                cmd = cmd.description(description);
            }
            let reward = engine.create_reward(cmd).await?;
            println!(
                "created reward: {} ({}) for {} coins",
                reward.name, reward.id, reward.coin_cost
            );
        }
        Command::Scheduler(Scheduler {
            command: SchedulerCommand::Run { timezone },
        }) => {
            let run = engine
                .run_recurring_tasks(Utc::now().with_timezone(&timezone))
                .await?;
            println!(
                "{}: {} recurring task(s) due, {} assignment(s) created",
                run.date, run.tasks_considered, run.assignments_created
            );
        }
        Command::Badges => {
            let badges = engine.badges().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&badges)?);
                return Ok(());
            }
            for badge in badges {
                println!(
                    "{}\t{} >= {}\t{}",
                    badge.name,
                    badge.condition.kind_str(),
                    badge.condition.threshold(),
                    badge.description
                );
            }
        }
    }

    Ok(())
}

mod app;
mod auth;
mod cli;
mod collection;
mod completion;
mod db;
mod entities;
mod error;
mod model;
mod prefs;
mod progress;
mod session;
mod store;
mod tree;
mod util;

use clap::Parser;
use sea_orm::DatabaseConnection;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::auth::{IdentityProvider, LocalIdentity};
use crate::cli::{
    AuthCommand, AuthSignIn, AuthSignUp, Cli, Command, GoalAdd, GoalCommand, GoalPin, GoalRemove,
    GoalShow, GoalUpdate, TaskAdd, TaskCommand, TaskRef, TaskRemove, TaskUpdate, ThemeCommand,
};
use crate::completion::TogglePlan;
use crate::error::AppError;
use crate::model::{DeleteTarget, GoalInput, GoalSort, TaskInput, TaskSort};
use crate::prefs::Prefs;
use crate::store::SeaOrmGoalStore;
use crate::tree::find_task;
use crate::util::{format_goal_detail, format_goal_list, format_stats};

const LOG_ENV: &str = "GOALMAP_LOG";

type GoalApp = App<SeaOrmGoalStore>;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

async fn run() -> Result<(), AppError> {
    let Cli {
        home,
        goal_sort,
        task_sort,
        command,
    } = Cli::parse();
    let home = db::resolve_home(home)?;
    debug!(home = %home.display(), "resolved data directory");

    if let Command::Theme(command) = command {
        return handle_theme(&Prefs::new(db::resolve_prefs_path(&home)), command);
    }

    let db_path = db::resolve_db_path(&home);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let identity = LocalIdentity::new(db.clone(), db::resolve_session_path(&home));
    identity.restore().await?;

    match command {
        Command::Auth(command) => handle_auth(&identity, command).await,
        Command::Goal(command) => {
            let mut app = open_app(db, &identity, goal_sort.into(), task_sort.into()).await?;
            handle_goal(&mut app, command).await
        }
        Command::Task(command) => {
            let mut app = open_app(db, &identity, goal_sort.into(), task_sort.into()).await?;
            handle_task(&mut app, command).await
        }
        Command::Theme(_) => Ok(()),
    }
}

async fn open_app(
    db: DatabaseConnection,
    identity: &LocalIdentity,
    goal_sort: GoalSort,
    task_sort: TaskSort,
) -> Result<GoalApp, AppError> {
    let mut app = App::new(SeaOrmGoalStore::new(db), goal_sort, task_sort);
    let user = identity.subscribe().borrow().clone();
    app.handle_auth_change(user).await?;
    app.session().require_user()?;
    Ok(app)
}

async fn handle_auth(identity: &LocalIdentity, command: AuthCommand) -> Result<(), AppError> {
    match command {
        AuthCommand::SignUp(AuthSignUp {
            email,
            password,
            display_name,
        }) => {
            let user = identity.sign_up(&email, &password, &display_name).await?;
            println!("Signed up as {} ({})", user.display_name(), user.email);
        }
        AuthCommand::SignIn(AuthSignIn { email, password }) => {
            let user = identity.sign_in(&email, &password).await?;
            println!("Signed in as {} ({})", user.display_name(), user.email);
        }
        AuthCommand::SignOut => {
            identity.sign_out().await?;
            println!("Signed out.");
        }
        AuthCommand::Whoami => match identity.subscribe().borrow().as_ref() {
            Some(user) => println!("{} ({})", user.display_name(), user.email),
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

async fn handle_goal(app: &mut GoalApp, command: GoalCommand) -> Result<(), AppError> {
    match command {
        GoalCommand::Add(args) => handle_goal_add(app, args).await,
        GoalCommand::List => handle_goal_list(app),
        GoalCommand::Show(args) => handle_goal_show(app, args),
        GoalCommand::Update(args) => handle_goal_update(app, args).await,
        GoalCommand::Pin(args) => handle_goal_pin(app, args).await,
        GoalCommand::Remove(args) => handle_goal_remove(app, args).await,
        GoalCommand::Stats => handle_goal_stats(app),
    }
}

async fn handle_task(app: &mut GoalApp, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(app, args).await,
        TaskCommand::Update(args) => handle_task_update(app, args).await,
        TaskCommand::Done(args) => handle_task_toggle(app, args, true).await,
        TaskCommand::Undo(args) => handle_task_toggle(app, args, false).await,
        TaskCommand::Remove(args) => handle_task_remove(app, args).await,
    }
}

fn handle_theme(prefs: &Prefs, command: ThemeCommand) -> Result<(), AppError> {
    let theme = match command {
        ThemeCommand::Show => prefs.theme(),
        ThemeCommand::Set(args) => prefs.set_theme(args.theme.into())?,
        ThemeCommand::Toggle => prefs.toggle_theme()?,
    };
    debug!(path = %prefs.path().display(), theme = theme.as_str(), "theme preference");
    println!("Theme: {}", theme.as_str());
    Ok(())
}

async fn handle_goal_add(app: &mut GoalApp, args: GoalAdd) -> Result<(), AppError> {
    app.begin_goal_edit(None)?;
    let id = app
        .submit_goal(GoalInput {
            title: args.title,
            description: args.description,
        })
        .await?;
    let goal = app.session().require_goal(id)?;
    println!("Created goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

fn handle_goal_list(app: &GoalApp) -> Result<(), AppError> {
    let session = app.session();
    if session.goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }
    println!(
        "{}",
        format_goal_list(&session.goals, &session.stats(), session.goal_sort)
    );
    Ok(())
}

fn handle_goal_show(app: &mut GoalApp, args: GoalShow) -> Result<(), AppError> {
    app.select_goal(args.id)?;
    let session = app.session();
    let goal = session.require_current_goal()?;
    println!("{}", format_goal_detail(goal, &session.visible_tasks()));
    Ok(())
}

async fn handle_goal_update(app: &mut GoalApp, args: GoalUpdate) -> Result<(), AppError> {
    if args.title.is_none() && args.description.is_none() {
        return Err(AppError::Validation(
            "goal update requires --title or --description".to_string(),
        ));
    }
    let goal = app.session().require_goal(args.id)?;
    let input = GoalInput {
        title: args.title.unwrap_or_else(|| goal.title.clone()),
        description: args.description.or_else(|| goal.description.clone()),
    };
    app.begin_goal_edit(Some(args.id))?;
    app.submit_goal(input).await?;
    println!("Updated goal ID: {}.", args.id);
    Ok(())
}

async fn handle_goal_pin(app: &mut GoalApp, args: GoalPin) -> Result<(), AppError> {
    let pinned = app.toggle_pin(args.id).await?;
    if pinned {
        println!("Pinned goal ID: {}.", args.id);
    } else {
        println!("Unpinned goal ID: {}.", args.id);
    }
    Ok(())
}

async fn handle_goal_remove(app: &mut GoalApp, args: GoalRemove) -> Result<(), AppError> {
    app.request_delete(DeleteTarget::Goal(args.id))?;
    finish_delete(app, args.dry_run).await
}

fn handle_goal_stats(app: &GoalApp) -> Result<(), AppError> {
    let session = app.session();
    println!("{}", format_stats(&session.stats(), &session.goals));
    Ok(())
}

async fn handle_task_add(app: &mut GoalApp, args: TaskAdd) -> Result<(), AppError> {
    app.select_goal(args.goal_id)?;
    app.begin_task_edit(None)?;
    let task_id = app
        .submit_task(TaskInput {
            title: args.title,
            description: args.description,
            parent_id: args.parent,
        })
        .await?;
    println!("Created task ID: {task_id}");
    Ok(())
}

async fn handle_task_update(app: &mut GoalApp, args: TaskUpdate) -> Result<(), AppError> {
    if args.title.is_none() && args.description.is_none() {
        return Err(AppError::Validation(
            "task update requires --title or --description".to_string(),
        ));
    }
    let goal = app.select_goal(args.goal_id)?;
    let task = find_task(&goal.tasks, &args.task_id)
        .ok_or_else(|| AppError::NotFound(format!("task id {}", args.task_id)))?;
    let input = TaskInput {
        title: args.title.unwrap_or_else(|| task.title.clone()),
        description: args.description.or_else(|| task.description.clone()),
        parent_id: None,
    };
    app.begin_task_edit(Some(args.task_id.clone()))?;
    app.submit_task(input).await?;
    println!("Updated task ID: {}.", args.task_id);
    Ok(())
}

async fn handle_task_toggle(
    app: &mut GoalApp,
    args: TaskRef,
    completed: bool,
) -> Result<(), AppError> {
    app.select_goal(args.goal_id)?;
    let plan = app.toggle_task(&args.task_id, completed).await?;
    let state = if completed { "done" } else { "not done" };
    println!("Task ID: {} marked {state}.", args.task_id);
    print_status_changes(&args.task_id, &plan);
    Ok(())
}

async fn handle_task_remove(app: &mut GoalApp, args: TaskRemove) -> Result<(), AppError> {
    app.select_goal(args.goal_id)?;
    app.request_delete(DeleteTarget::Task {
        goal_id: args.goal_id,
        task_id: args.task_id,
    })?;
    finish_delete(app, args.dry_run).await
}

async fn finish_delete(app: &mut GoalApp, dry_run: bool) -> Result<(), AppError> {
    if dry_run {
        if let Some(pending) = app.session().pending_delete.as_ref() {
            println!(
                "Would delete {} \"{}\".",
                pending.kind().as_str(),
                pending.display_title
            );
        }
        app.cancel_delete();
        return Ok(());
    }
    let removed = app.confirm_delete().await?;
    println!(
        "Deleted {} \"{}\".",
        removed.kind().as_str(),
        removed.display_title
    );
    Ok(())
}

fn print_status_changes(task_id: &str, plan: &TogglePlan) {
    let automatic: Vec<_> = plan
        .changes
        .iter()
        .filter(|change| change.task_id != task_id)
        .collect();
    if automatic.is_empty() {
        return;
    }

    println!("Auto status updates:");
    for change in automatic {
        println!(
            "- Task ID: {} status auto-updated from {} to {} ({}).",
            change.task_id,
            status_label(change.from),
            status_label(change.to),
            change.reason
        );
    }
}

fn status_label(completed: bool) -> &'static str {
    if completed {
        "done"
    } else {
        "todo"
    }
}

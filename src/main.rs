mod app;
mod cli;
mod columns;
mod db;
mod deeplink;
mod domain;
mod due;
mod identity;
mod logging;
mod prefs;
mod reorder;
mod store;
mod subscription;
mod ui;
mod view;

use std::time::Duration;

use app::{App, AppError, NewIssueInput, ReorderOutcome, UpdateIssueInput};
use cli::{Cli, ColumnsSubcommands, Commands, DefaultsSubcommands, ViewArgs};
use domain::defaults::LabelKind;
use domain::issue::Issue;
use identity::Identity;
use prefs::PrefsStore;
use subscription::{IssueCache, SubscriptionEvent};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), AppError> {
    use clap::Parser;

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let identity = Identity::new(
        cli.user_id.as_deref().unwrap_or_default(),
        cli.user_email.as_deref(),
        cli.user_name.as_deref(),
    )
    .ok_or(AppError::Unauthenticated)?;
    let prefs = PrefsStore::new(cli.prefs.clone().unwrap_or_else(PrefsStore::default_path));
    tracing::debug!(
        db = %cli.db,
        prefs = %prefs.path().display(),
        uid = %identity.uid,
        "opening store"
    );
    let app = App::open(&cli.db, identity, prefs)?;

    match cli.command {
        Commands::New(args) => {
            let issue = app.create_issue(NewIssueInput {
                title: args.title,
                problem_description: args.problem,
                solution_description: args.solution,
                priority: args.priority,
                assigned_to: args.assigned_to,
                technology: args.technology,
                due_date: args.due,
            })?;
            println!("created {}", issue_ref(&issue));
        }
        Commands::Ls(args) => {
            let (filters, sort) = args.view.resolve();
            let issues = app.list_issues(&filters, sort)?;
            if args.json {
                print_json(&issues);
            } else {
                let columns = app.columns();
                let defaults = app.defaults()?;
                ui::print_issue_table(
                    &issues,
                    &ui::TableContext {
                        columns: &columns,
                        defaults: &defaults,
                        filters: &filters,
                        sort,
                        today: due::today_utc(),
                        selected: None,
                    },
                );
            }
        }
        Commands::Show(args) => {
            let issue = if deeplink::parse_fragment(&args.target).is_some() {
                let (filters, sort) = args.view.resolve();
                app.resolve_link(&args.target, &filters, sort)?
            } else {
                app.show_issue(&args.target)?
            };
            if args.json {
                print_json(&issue);
            } else {
                let link = args
                    .base
                    .as_deref()
                    .map(|base| deeplink::issue_link(base, &issue.id));
                let defaults = app.defaults()?;
                ui::print_issue_detail(&issue, &defaults, link.as_deref(), due::today_utc());
            }
        }
        Commands::Update(args) => {
            let issue = app.update_issue(
                &args.id,
                UpdateIssueInput {
                    title: args.title,
                    problem_description: args.problem,
                    solution_description: args.solution,
                    clear_solution: args.clear_solution,
                    status: args.status,
                    priority: args.priority,
                    assigned_to: args.assigned_to,
                    technology: args.technology,
                    due_date: args.due,
                    clear_due_date: args.clear_due,
                },
            )?;
            println!("updated {} [{}]", issue_ref(&issue), issue.status);
        }
        Commands::Move(args) => {
            let (filters, sort) = args.view.resolve();
            let outcome = app.reorder_issues(
                &filters,
                sort,
                cli::zero_based(args.from),
                cli::zero_based(args.to),
            )?;
            match outcome {
                ReorderOutcome::Applied(plan) if args.json => print_json(&plan),
                ReorderOutcome::Applied(plan) => println!(
                    "moved row {} to {} ({} orders written)",
                    args.from,
                    args.to,
                    plan.len()
                ),
                ReorderOutcome::Skipped(reason) => println!("nothing changed: {reason}"),
            }
        }
        Commands::Link(args) => {
            println!("{}", app.issue_link(&args.base, &args.id)?);
        }
        Commands::Filters(args) => {
            let options = app.filter_options()?;
            if args.json {
                print_json(&options);
            } else {
                ui::print_filter_options(&options);
            }
        }
        Commands::Watch(args) => {
            run_watch(
                &app,
                &args.view,
                args.select.as_deref(),
                args.interval_ms,
                args.max_snapshots,
            )?;
        }
        Commands::Defaults(args) => {
            let defaults = match args.command {
                DefaultsSubcommands::Show(show) => {
                    let defaults = app.defaults()?;
                    if show.json {
                        print_json(&defaults);
                        return Ok(());
                    }
                    defaults
                }
                DefaultsSubcommands::AddPerson(person) => {
                    app.add_person(&person.name, person.email.as_deref())?
                }
                DefaultsSubcommands::RemovePerson(arg) => app.remove_person(&arg.value)?,
                DefaultsSubcommands::AddPriority(arg) => {
                    app.add_label(LabelKind::Priority, &arg.value)?
                }
                DefaultsSubcommands::RemovePriority(arg) => {
                    app.remove_label(LabelKind::Priority, &arg.value)?
                }
                DefaultsSubcommands::AddTechnology(arg) => {
                    app.add_label(LabelKind::Technology, &arg.value)?
                }
                DefaultsSubcommands::RemoveTechnology(arg) => {
                    app.remove_label(LabelKind::Technology, &arg.value)?
                }
            };
            ui::print_defaults(&defaults);
        }
        Commands::Columns(args) => {
            let layout = match args.command {
                ColumnsSubcommands::Show(show) => {
                    let layout = app.columns();
                    if show.json {
                        print_json(&layout);
                        return Ok(());
                    }
                    layout
                }
                ColumnsSubcommands::Toggle(toggle) => app.toggle_column(&toggle.id)?,
                ColumnsSubcommands::Move(moved) => {
                    app.move_column(cli::zero_based(moved.from), cli::zero_based(moved.to))?
                }
                ColumnsSubcommands::Reset => app.reset_columns()?,
            };
            ui::print_columns(&layout);
        }
    }

    Ok(())
}

/// Renders the view on every snapshot until the feed ends or `max_snapshots`
/// renders have happened.
fn run_watch(
    app: &App,
    view: &ViewArgs,
    select: Option<&str>,
    interval_ms: Option<u64>,
    max_snapshots: Option<usize>,
) -> Result<(), AppError> {
    let (filters, sort) = view.resolve();
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or(subscription::DEFAULT_POLL_INTERVAL);
    let subscription = app.subscribe(interval)?;
    let mut cache = IssueCache::default();
    let mut selected: Option<String> = None;
    let mut rendered = 0usize;

    while let Some(event) = subscription.recv() {
        let failed = matches!(event, SubscriptionEvent::Failed(_));
        cache.apply(event);
        if failed {
            tracing::debug!(error = ?cache.last_error(), "keeping last good view");
            continue;
        }

        let issues = view::derive_view(cache.issues(), &filters, sort);
        if let Some(location) = select {
            if let Some(issue) =
                deeplink::resolve(location, &issues, cache.is_loading(), selected.as_deref())
            {
                tracing::info!(id = %issue.id, "selected linked issue");
                selected = Some(issue.id.clone());
            }
        }
        let columns = app.columns();
        ui::print_issue_table(
            &issues,
            &ui::TableContext {
                columns: &columns,
                defaults: cache.defaults(),
                filters: &filters,
                sort,
                today: due::today_utc(),
                selected: selected.as_deref(),
            },
        );
        rendered += 1;
        if max_snapshots.is_some_and(|max| rendered >= max) {
            break;
        }
    }
    Ok(())
}

fn issue_ref(issue: &Issue) -> String {
    format!("#{} {} ({})", issue.deviation_no, issue.title, issue.id)
}

//! Command dispatch: one handler per subcommand

use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use colored::Colorize;
use tracing::{debug, instrument};

use crate::application::services::WizardService;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, GraphFormat, WizardCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::repl::Repl;
use crate::config::{global_config_path, project_config_path, Settings};
use crate::domain::graph::{reachable, StepsCalculator};
use crate::domain::render::TreeRender;
use crate::domain::{export_tree, DomainError, Position, Progress, Tree, TreeKey, Walk};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::Selector;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    let default_tree = container.settings.default_tree;
    let key = |tree: &Option<TreeKey>| tree.unwrap_or(default_tree);

    match &cli.command {
        Some(Commands::Show { tree }) => cmd_show(container, key(tree)),
        Some(Commands::Validate { tree }) => cmd_validate(container, key(tree)),
        Some(Commands::Steps { tree, node }) => cmd_steps(container, key(tree), node.as_deref()),
        Some(Commands::Graph { tree, format }) => cmd_graph(container, key(tree), *format),
        Some(Commands::Export { tree, output }) => {
            cmd_export(container, key(tree), output.as_deref())
        }
        Some(Commands::Import { file, tree }) => cmd_import(container, key(tree), file),
        Some(Commands::Edit { tree }) => cmd_edit(container, key(tree)),
        Some(Commands::Wizard { command }) => match command {
            WizardCommands::Run { tree, resume, code } => {
                cmd_wizard_run(container, key(tree), *resume, code.as_deref())
            }
            WizardCommands::Share { tree } => cmd_wizard_share(container, key(tree)),
            WizardCommands::Reset { tree } => cmd_wizard_reset(container, key(tree)),
        },
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cmd_config_show(container),
            ConfigCommands::Init { global } => cmd_config_init(container, *global),
            ConfigCommands::Path => cmd_config_path(container),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `bactree --help`".to_string(),
        )),
    }
}

fn load_tree(container: &ServiceContainer, key: TreeKey) -> CliResult<Tree> {
    Ok(container.editor_service().load_tree(key)?)
}

#[instrument(level = "debug", skip(container))]
fn cmd_show(container: &ServiceContainer, key: TreeKey) -> CliResult<()> {
    let tree = load_tree(container, key)?;
    output::header(key.title());
    output::info(&tree.to_tree_string());
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_validate(container: &ServiceContainer, key: TreeKey) -> CliResult<()> {
    let tree = load_tree(container, key)?;
    let report = crate::domain::validate(&tree);

    output::header(&format!("{} ({} nodes)", key.title(), tree.len()));
    for issue in &report.errors {
        output::failure(issue);
    }
    for issue in &report.warnings {
        output::warning(issue);
    }

    if report.has_errors() {
        return Err(CliError::InvalidTree(format!(
            "{} error(s), {} warning(s)",
            report.errors.len(),
            report.warnings.len()
        )));
    }
    if report.is_valid() {
        output::success("tree is valid");
    } else {
        output::success(&format!("no errors, {} warning(s)", report.warnings.len()));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_steps(container: &ServiceContainer, key: TreeKey, node: Option<&str>) -> CliResult<()> {
    let tree = load_tree(container, key)?;
    let mut calc = StepsCalculator::new(&tree);

    if let Some(id) = node {
        if !tree.contains(id) {
            return Err(DomainError::NodeNotFound(id.to_string()).into());
        }
        let steps = calc.steps(id)?;
        output::info(&format!("{id}: min {} max {}", steps.min, steps.max));
        return Ok(());
    }

    for id in reachable(&tree).into_iter().filter(|id| tree.contains(id)) {
        let steps = calc.steps(&id)?;
        output::detail(&format!("{:<24} {:>3} {:>3}", id, steps.min, steps.max));
    }
    output::action("max steps", &calc.max_steps()?);
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_graph(container: &ServiceContainer, key: TreeKey, format: GraphFormat) -> CliResult<()> {
    let tree = load_tree(container, key)?;
    let view = crate::domain::GraphView::from_tree(&tree);
    match format {
        GraphFormat::Json => {
            let json = serde_json::to_string_pretty(&view).map_err(|e| {
                ApplicationError::OperationFailed {
                    context: "serialize graph".to_string(),
                    source: Box::new(e),
                }
            })?;
            output::info(&json);
        }
        GraphFormat::Dot => output::info(&view.to_dot()),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_export(container: &ServiceContainer, key: TreeKey, target: Option<&Path>) -> CliResult<()> {
    let tree = load_tree(container, key)?;
    let content = export_tree(&tree)?;
    match target {
        Some(path) => {
            container
                .fs
                .ensure_parent(path)
                .and_then(|_| container.fs.write(path, &content))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Exported", &path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_import(container: &ServiceContainer, key: TreeKey, file: &Path) -> CliResult<()> {
    if !container.fs.is_file(file) {
        return Err(CliError::MissingInput(file.to_path_buf()));
    }
    let service = container.editor_service();
    let tree = service.import_file(key, file)?;
    output::action(
        "Imported",
        &format!(
            "{} nodes into {}",
            tree.len(),
            service.paths().get(key).display()
        ),
    );
    let report = crate::domain::validate(&tree);
    for issue in report.errors.iter().chain(&report.warnings) {
        output::warning(issue);
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_edit(container: &ServiceContainer, key: TreeKey) -> CliResult<()> {
    let service = container.editor_service();
    let session = service.open_session(key)?;
    output::info(&format!(
        "Editing {} (type `help` for commands)",
        key.title()
    ));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut repl = Repl::new(&service, container.editor.as_ref(), session);
    repl.run(stdin.lock(), &mut stdout)
}

#[instrument(level = "debug", skip(container))]
fn cmd_wizard_run(
    container: &ServiceContainer,
    key: TreeKey,
    resume: bool,
    code: Option<&str>,
) -> CliResult<()> {
    let service = container.wizard_service();
    let shared = code.map(str::parse::<Position>).transpose()?;
    // A shared code names its own tree
    let key = shared.as_ref().map(|p| p.tree).unwrap_or(key);
    let tree = load_tree(container, key)?;

    let mut walk = match &shared {
        Some(position) => service.open(position, &tree)?,
        None => service.start(key, &tree, resume)?,
    };

    let mut stdout = io::stdout();
    run_wizard(
        &service,
        container.selector.as_ref(),
        key,
        &tree,
        &mut walk,
        &mut stdout,
    )?;
    output::action("Position", &walk.position(key));
    Ok(())
}

/// Drives `walk` with picks from `selector` until the user quits or cancels.
pub fn run_wizard<W: Write>(
    service: &WizardService,
    selector: &dyn Selector,
    key: TreeKey,
    tree: &Tree,
    walk: &mut Walk,
    out: &mut W,
) -> CliResult<()> {
    loop {
        render_step(tree, walk, out)?;

        let items = service.menu(tree, walk);
        let prompt = format!("{}> ", key);
        let picked = selector
            .select_one(&items, &prompt)
            .map_err(|message| InfraError::Selector { message })?;
        let Some(item) = picked else {
            debug!("wizard: selection cancelled");
            return Ok(());
        };

        let action = item.value.parse().map_err(CliError::InvalidArgs)?;
        if !service.apply(key, tree, walk, action)? {
            return Ok(());
        }
    }
}

fn render_step<W: Write>(tree: &Tree, walk: &Walk, out: &mut W) -> CliResult<()> {
    let write_err = |e: io::Error| CliError::from(InfraError::io("write output", e));
    let Some(node) = walk.current(tree) else {
        return Ok(());
    };

    let trail = walk
        .history()
        .iter()
        .map(|id| tree.get(id).map(|n| n.label.as_str()).unwrap_or(id.as_str()))
        .collect::<Vec<_>>()
        .join(" > ");
    writeln!(out, "\n{}", trail.dimmed()).map_err(write_err)?;

    let progress = walk.progress(tree)?;
    writeln!(
        out,
        "[{:>3}%] {}",
        progress.percent(),
        progress.remaining_text()
    )
    .map_err(write_err)?;

    match progress {
        Progress::Complete { .. } => {
            let organism = node.organism().unwrap_or_default();
            writeln!(out, "{} {}", "Organism identified:".green().bold(), organism)
                .map_err(write_err)?;
        }
        Progress::Running { .. } => {
            writeln!(out, "{}", node.label.bold()).map_err(write_err)?;
            if let Some(question) = node.question().filter(|q| !q.is_empty()) {
                writeln!(out, "{question}").map_err(write_err)?;
            }
        }
    }
    if !node.description.is_empty() {
        writeln!(out, "{}", node.description.dimmed()).map_err(write_err)?;
    }
    Ok(())
}

fn cmd_wizard_share(container: &ServiceContainer, key: TreeKey) -> CliResult<()> {
    let position = container.wizard_service().share(key)?;
    output::info(&position);
    Ok(())
}

fn cmd_wizard_reset(container: &ServiceContainer, key: TreeKey) -> CliResult<()> {
    container.session_store().clear(key)?;
    output::success(&format!("{} wizard reset", key.title()));
    Ok(())
}

fn cmd_config_show(container: &ServiceContainer) -> CliResult<()> {
    output::info(&container.settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(container: &ServiceContainer, global: bool) -> CliResult<()> {
    let path = if global {
        global_config_path().ok_or_else(|| {
            CliError::Usage("cannot determine global config directory".to_string())
        })?
    } else {
        project_config_path(&container.project_dir)
    };

    if container.fs.exists(&path) {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    container
        .fs
        .ensure_parent(&path)
        .and_then(|_| container.fs.write(&path, &Settings::template()))
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}

fn cmd_config_path(container: &ServiceContainer) -> CliResult<()> {
    let show = |label: &str, path: &Path, fs_exists: bool| {
        let state = if fs_exists {
            "(exists)".green()
        } else {
            "(not found)".dimmed()
        };
        output::info(&format!("{label:<8} {} {state}", path.display()));
    };

    match global_config_path() {
        Some(path) => show("global:", &path, container.fs.exists(&path)),
        None => output::info("global:  (unavailable)"),
    }
    let local = project_config_path(&container.project_dir);
    show("project:", &local, container.fs.exists(&local));

    let paths = container.tree_paths();
    for key in TreeKey::ALL {
        let path = paths.get(key);
        show(&format!("{key}:"), path, container.fs.exists(path));
    }
    show(
        "data:",
        &container.settings.data_dir,
        container.fs.exists(&container.settings.data_dir),
    );
    Ok(())
}

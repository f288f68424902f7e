use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use rand::{SeedableRng, rngs::StdRng};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use task_world_core::{
    ItemKind, ObjectKind,
    action::{Action, ActionOutcome},
    agent::{Agent, RandomAgent, TaskPlanner},
    config::WorldConfig,
    episode::run_experiment,
    layout::Layout as WorldLayout,
    map::CellContents,
    world::WorldState,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    Planner,
    Random,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Layout file to load (defaults to the built-in canonical layout)
    #[arg(short, long, value_name = "LAYOUT_FILE")]
    layout: Option<PathBuf>,

    /// TOML file overriding world rules and rewards
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Policy that chooses the agent's actions
    #[arg(short, long, value_enum, default_value_t = Policy::Planner)]
    policy: Policy,

    /// Seed for the random policy and randomized layouts
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Scatter objects randomly instead of using the canonical layout
    #[arg(long, conflicts_with = "layout")]
    random_layout: bool,

    /// Run this many episodes without a UI and print a summary
    #[arg(short, long)]
    episodes: Option<usize>,

    /// Step limit per episode
    #[arg(long, default_value_t = 500)]
    max_steps: usize,

    /// Write logs to this file (controlled by RUST_LOG)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

/// Everything needed to build fresh worlds and agents.
struct Setup {
    layout: Option<WorldLayout>,
    config: WorldConfig,
    policy: Policy,
    seed: u64,
    random_layout: bool,
}

impl Setup {
    fn from_args(args: &Args) -> Result<Self> {
        let layout = match &args.layout {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading layout {}", path.display()))?;
                let layout = WorldLayout::parse(&text)
                    .with_context(|| format!("parsing {}", path.display()))?;
                Some(layout)
            }
            None => None,
        };
        let config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                WorldConfig::from_toml_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => WorldConfig::default(),
        };
        Ok(Setup {
            layout,
            config,
            policy: args.policy,
            seed: args.seed,
            random_layout: args.random_layout,
        })
    }

    fn world(&self, episode: usize) -> Result<WorldState> {
        let layout = if self.random_layout {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(episode as u64));
            WorldLayout::randomized(&mut rng)
        } else {
            self.layout.clone().unwrap_or_default()
        };
        Ok(WorldState::with_layout(layout, self.config.clone())?)
    }

    fn agent(&self, episode: usize) -> Box<dyn Agent> {
        match self.policy {
            Policy::Planner => Box::new(TaskPlanner::new()),
            Policy::Random => Box::new(RandomAgent::new(self.seed.wrapping_add(episode as u64))),
        }
    }
}

struct App {
    /// The world being simulated.
    world: WorldState,
    /// Chooses one action per tick.
    agent: Box<dyn Agent>,
    /// Return accumulated since the last reset.
    episode_return: f64,
    steps: usize,
    max_steps: usize,
    last: Option<(Action, ActionOutcome)>,
    paused: bool,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(setup: &Setup, max_steps: usize) -> Result<Self> {
        Ok(App {
            world: setup.world(0)?,
            agent: setup.agent(0),
            episode_return: 0.0,
            steps: 0,
            max_steps,
            last: None,
            paused: false,
            should_quit: false,
        })
    }

    fn finished(&self) -> bool {
        self.world.is_goal_reached() || self.steps >= self.max_steps
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.finished() {
            return;
        }
        let action = self.agent.choose_action(&self.world);
        let outcome = self.world.execute(action);
        self.episode_return += outcome.reward + self.world.carrying_reward();
        self.steps += 1;
        self.last = Some((action, outcome));
        if self.world.is_goal_reached() {
            info!(steps = self.steps, total_return = self.episode_return, "goal reached");
        }
    }

    fn reset(&mut self) {
        self.world.reset();
        self.episode_return = 0.0;
        self.steps = 0;
        self.last = None;
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args)?;
    let setup = Setup::from_args(&args)?;

    if let Some(episodes) = args.episodes {
        return run_headless(&setup, episodes, args.max_steps);
    }

    let mut app = App::new(&setup, args.max_steps)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Logs go to `--log-file` if given. Headless runs fall back to stderr; the
/// interactive UI stays silent otherwise.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if args.episodes.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn run_headless(setup: &Setup, episodes: usize, max_steps: usize) -> Result<()> {
    // Validate the layout once so per-episode construction cannot fail.
    setup.world(0)?;
    let summary = run_experiment(
        episodes,
        max_steps,
        |episode| setup.world(episode).unwrap_or_default(),
        |episode| setup.agent(episode),
    );
    println!("=== Experiment ({} episodes) ===", summary.episodes);
    println!("Average utility: {:.4}", summary.average);
    println!("Min utility: {:.4}", summary.min);
    println!("Max utility: {:.4}", summary.max);
    println!("Goals reached: {}/{}", summary.successes, summary.episodes);
    println!("Success rate: {:.2}%", summary.success_rate() * 100.0);
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char('r') => app.reset(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    KeyCode::Char('n') if app.paused => app.tick(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if !app.paused {
                app.tick();
            }
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Area for the map
            Constraint::Percentage(30), // Area for inventory and progress
            Constraint::Percentage(10), // Area for status/help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.world);
    render_status(frame, main_layout[1], app);

    let state = if app.world.is_goal_reached() {
        "goal reached"
    } else if app.steps >= app.max_steps {
        "step limit"
    } else if app.paused {
        "paused"
    } else {
        "running"
    };
    let help_text = Paragraph::new(format!(
        "[{state}]  q/Esc quit  r reset  space pause  n step (paused)"
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn item_label(item: ItemKind) -> &'static str {
    match item {
        ItemKind::Brush => "B",
        ItemKind::Key => "K",
        ItemKind::Code => "Cd",
        ItemKind::Color => "Cl",
    }
}

fn flag(done: bool) -> Span<'static> {
    if done {
        Span::styled("yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("no", Style::default().fg(Color::DarkGray))
    }
}

/// Renders inventory, task progress and the last action.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let world = &app.world;
    let held: Vec<&str> = world.inventory().iter().map(|i| item_label(*i)).collect();
    let position = world.agent_position();
    let last = match app.last {
        Some((action, outcome)) => format!(
            "{:?} -> {} ({:+.2})",
            action,
            if outcome.success { "ok" } else { "illegal" },
            outcome.reward
        ),
        None => "-".to_string(),
    };

    let lines = vec![
        ListItem::from(Line::from(format!(
            "Agent {}: ({}, {})  Carrying {}/{}: {}",
            app.agent.name(),
            position.x,
            position.y,
            held.len(),
            world.config().max_carry,
            held.join(" ")
        ))),
        ListItem::from(Line::from(vec![
            Span::raw("Table painted: "),
            flag(world.table_colored()),
            Span::raw("  Chair painted: "),
            flag(world.chair_colored()),
            Span::raw("  Door open: "),
            flag(world.door_open()),
        ])),
        ListItem::from(Line::from(format!(
            "Step {}  Return {:+.2}  Last: {}",
            app.steps, app.episode_return, last
        ))),
    ];

    let status_widget =
        List::new(lines).block(Block::default().borders(Borders::ALL).title("Inventory"));
    frame.render_widget(status_widget, area);
}

/// Label and style for the most notable object on a cell.
fn cell_span(cell: &CellContents, world: &WorldState) -> Span<'static> {
    if cell.is_wall() {
        return Span::styled("####", Style::default().fg(Color::DarkGray));
    }
    let label = |text: &'static str, color: Color| {
        Span::styled(format!("{text:^4}"), Style::default().fg(color))
    };
    for item in ItemKind::ALL {
        if cell.has(item.object()) {
            return label(item_label(item), Color::Yellow);
        }
    }
    let painted = |done: bool| if done { Color::Green } else { Color::White };
    if cell.has(ObjectKind::Table) {
        return label("T", painted(world.table_colored()));
    }
    if cell.has(ObjectKind::Chair) {
        return label("Ch", painted(world.chair_colored()));
    }
    if cell.has(ObjectKind::Door) {
        return if world.door_open() {
            label("+", Color::Green)
        } else {
            label("D", Color::Red)
        };
    }
    Span::raw(" .  ")
}

/// Renders the world grid onto the frame.
fn render_map(frame: &mut Frame, area: Rect, world: &WorldState) {
    let cells = world.cells();
    let agent = world.agent_position();
    let mut lines: Vec<Line> = Vec::with_capacity(cells.height());

    for y in 0..cells.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(cells.width());
        for x in 0..cells.width() {
            let position = task_world_core::Position::new(x, y);
            if position == agent {
                spans.push(Span::styled(" @  ", Style::default().fg(Color::Red).bold()));
            } else if let Some(cell) = cells.get(position) {
                spans.push(cell_span(cell, world));
            }
        }
        lines.push(Line::from(spans));
        lines.push(Line::default());
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Task World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

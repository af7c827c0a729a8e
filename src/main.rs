use clap::Parser;
use color_eyre::Result;
use csvboard::error_display::user_message_from_report;
use csvboard::{
    App, AppConfig, AppEvent, Args, CacheManager, ConfigManager, RestoreOutcome, Theme,
};
use ratatui::DefaultTerminal;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use tokio::runtime::Runtime;
use tracing::{info, warn};

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, app: &mut App, rx: Receiver<AppEvent>) -> Result<()> {
    let tx = app.sender();
    render(&mut terminal, app)?;

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(csvboard::APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Wrote default configuration to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(out) = &args.write_folder_structure {
        let root = args.data_root.as_deref().unwrap_or(".");
        let data_dir = Path::new(root).join(csvboard::locator::DATA_DIR);
        if let Err(e) = csvboard::menu::write_folder_structure(&data_dir, out) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        println!("Wrote folder structure of {} to {}", data_dir.display(), out.display());
        return Ok(Some(()));
    }

    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let mut config = AppConfig::load(csvboard::APP_NAME)?;
    config.apply_args(&args);
    config.validate()?;

    let cache = CacheManager::new(csvboard::APP_NAME)?;
    let log_path = csvboard::logging::init_logging(&config.logging, &cache)?;
    info!(log = %log_path.display(), root = %config.data.root, "starting csvboard");

    // loads spawned by the UI run on the worker thread
    let runtime: Runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let mut board = runtime.block_on(csvboard::build_board(&config))?;
    let restored = runtime.block_on(csvboard::restore_startup(
        &mut board,
        args.permalink.as_deref(),
        args.aggregate,
    ));
    match restored {
        Some(RestoreOutcome::Discarded(e)) => {
            warn!(error = %e, "permalink discarded");
            eprintln!("{}", csvboard::error_display::user_message_from_permalink(&e));
        }
        Some(outcome) => info!(?outcome, "permalink restored"),
        None => {}
    }

    let theme = Theme::from_config(&config.theme)?;
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(board, tx, runtime.handle().clone(), theme, config.display.clone());

    let terminal = ratatui::init();
    let result = run(terminal, &mut app, rx);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", user_message_from_report(&e));
        std::process::exit(1);
    }

    let fragment = app.board.surface().fragment();
    if !fragment.is_empty() {
        println!("#{}", fragment);
    }
    Ok(())
}

use colored::*;
use imagine_client::{
    logger, GeneratedImage, ImagineApp, ImagineClient, ImagineConfig, Key, PreviewFrame,
    SettingsField, SourceImage, Ui,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Renders the page's widgets as terminal output.
struct TerminalUi {
    client: ImagineClient,
}

impl TerminalUi {
    fn link(&self, url: &str) -> String {
        self.client
            .resolve(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }
}

impl Ui for TerminalUi {
    fn alert(&self, message: &str) {
        println!("\n{} {}", "⚠".red().bold(), message.red());
    }

    fn set_generate_enabled(&self, enabled: bool) {
        if enabled {
            println!("{}", "ready".green());
        } else {
            println!("{}", "generating…".yellow());
        }
    }

    fn show_progress(&self, percent: u8) {
        let filled = (percent as usize) / 5;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled.min(20)));
        print!("\r{} {:>3}% (estimated)", bar.cyan(), percent);
        let _ = std::io::stdout().flush();
    }

    fn hide_progress(&self) {
        print!("\r{}\r", " ".repeat(40));
        let _ = std::io::stdout().flush();
    }

    fn show_source_preview(&self, image: &SourceImage) {
        println!(
            "{} {} ({} byte preview)",
            "image prompt attached:".green(),
            image.filename,
            image.local_preview_data_url.len()
        );
    }

    fn clear_source_preview(&self) {
        println!("{}", "image prompt removed".bright_black());
    }

    fn render_gallery(&self, images: &[GeneratedImage]) {
        println!("\n{} ({} image(s))", "Gallery".bold(), images.len());
        for (i, image) in images.iter().enumerate() {
            println!("{}", imagine_client::controllers::gallery::thumbnail_caption(i, image));
        }
    }

    fn render_preview(&self, frame: &PreviewFrame) {
        let image = &frame.image;
        println!(
            "\n{} {}",
            format!("[{}/{}]", frame.index + 1, frame.total).bold(),
            image.prompt
        );
        println!("   {}", self.link(&image.url).underline());
        if let Some(seed) = image.seed {
            println!("   seed: {}", seed);
        }
        println!("   size: {}x{}", image.width, image.height);
        if !image.model.is_empty() {
            println!("   model: {}", image.model);
        }
        if let Some(source) = &frame.source_image_url {
            println!("   source: {}", self.link(source));
        }
        println!("{}", "   ←/→ with 'left'/'right', 'esc' to close".bright_black());
    }

    fn close_preview(&self) {
        println!("{}", "preview closed".bright_black());
    }
}

enum Command {
    Help,
    Generate(String),
    Set(SettingsField, String),
    Settings,
    Attach(String),
    Clear,
    List,
    Open(String),
    Key(Key),
    Save(usize),
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "help" | "?" => Command::Help,
            "gen" | "generate" => Command::Generate(rest.to_string()),
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Set(field.parse()?, value.trim().to_string())
            }
            "settings" => Command::Settings,
            "attach" if rest.is_empty() => return Err("usage: attach <path>".to_string()),
            "attach" => Command::Attach(rest.to_string()),
            "clear" => Command::Clear,
            "list" | "ls" => Command::List,
            "open" if rest.is_empty() => return Err("usage: open <n|url>".to_string()),
            "open" => Command::Open(rest.to_string()),
            "left" | "h" | "<" => Command::Key(Key::ArrowLeft),
            "right" | "l" | ">" => Command::Key(Key::ArrowRight),
            "esc" | "close" => Command::Key(Key::Escape),
            "save" => Command::Save(parse_position(rest)?),
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(Some(command))
    }
}

/// 1-based position as shown in the gallery.
fn parse_position(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("expected an image number, got '{}'", raw)),
    }
}

fn print_help() {
    println!("{}", "Commands".bold());
    println!("  gen <prompt>          generate images");
    println!("  set <field> <value>   batch, seed, guidance, steps, negative, width, height, model");
    println!("  settings              show current settings");
    println!("  attach <path>         upload an image prompt");
    println!("  clear                 remove the image prompt");
    println!("  list                  show the gallery");
    println!("  open <n|url>          preview an image");
    println!("  left | right | esc    navigate or close the preview");
    println!("  save <n>              download an image");
    println!("  quit");
}

fn print_settings(app: &ImagineApp) {
    let s = app.settings().current();
    println!("{}", "Settings".bold());
    println!("  model     {}", s.model_name);
    println!("  batch     {} (1-{})", s.batch_size, app.settings().max_batch_size());
    println!(
        "  seed      {}",
        s.seed.map_or("random".to_string(), |seed| seed.to_string())
    );
    println!("  guidance  {}", s.guidance_scale);
    println!("  steps     {}", s.step_count);
    println!("  size      {}x{}", s.width, s.height);
    println!("  negative  {}", s.negative_prompt);
    match app.upload().source() {
        Some(source) => println!("  image     {}", source.filename),
        None => println!("  image     none"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    let config = ImagineConfig::from_env();
    logger::init_with_config(logger::config_for(&config))?;

    if env_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using environment variables");
    }
    logger::log_startup_info("imagine", env!("CARGO_PKG_VERSION"), &config.base_url);
    logger::log_config_info(&config);

    let client = ImagineClient::new(&config)?;
    let ui = Arc::new(TerminalUi {
        client: client.clone(),
    });
    let app = ImagineApp::new(config, Arc::new(client), ui);

    let saved = app.saved_images().await;
    app.start(saved).await;
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e.yellow());
                continue;
            }
        };

        match command {
            Command::Help => print_help(),
            Command::Generate(prompt) => {
                // Runs in the background so the prompt stays responsive;
                // failures were already shown by the controller.
                let app = app.clone();
                tokio::spawn(async move {
                    let _ = app.generate(&prompt).await;
                });
            }
            Command::Set(field, value) => {
                app.settings().set(field, value);
                print_settings(&app);
            }
            Command::Settings => print_settings(&app),
            Command::Attach(path) => {
                let app = app.clone();
                tokio::spawn(async move {
                    let _ = app.upload().attach_path(path).await;
                });
            }
            Command::Clear => app.upload().clear(),
            Command::List => {
                let thumbnails = app.gallery().thumbnails();
                if thumbnails.is_empty() {
                    println!("{}", "gallery is empty".bright_black());
                }
                for line in thumbnails {
                    println!("{}", line);
                }
            }
            Command::Open(target) => {
                let opened = match parse_position(&target) {
                    Ok(index) => app.open_preview(index),
                    Err(_) => app.open_preview_by_url(&target),
                };
                if !opened {
                    println!("{}", format!("nothing to preview at '{}'", target).yellow());
                }
            }
            Command::Key(key) => app.key(key),
            Command::Save(index) => match app.save_image(index).await {
                Ok(path) => println!("saved {}", path.display()),
                Err(e) => println!("{}", e.to_string().red()),
            },
            Command::Quit => break,
        }
    }

    log::info!("👋 Bye");
    Ok(())
}

//! `jsbundle` — CLI des bundles indexés
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation (logger,
//! couleur), et délégation à `jsbundle_cli` (lib).

#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use jsbundle_cli as cli;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "jsbundle", version, about = "Décompresser, patcher et reconstruire des bundles indexés", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Sous-commandes
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extraire chaque module d'un bundle dans un répertoire
    Unpack {
        /// Bundle à lire
        #[arg(short = 'p', long = "bundle")]
        bundle: PathBuf,
        /// Répertoire de sortie
        #[arg(short = 'o', long = "output-dir", default_value = cli::DEFAULT_MODULES_DIR)]
        output_dir: PathBuf,
        /// Afficher le temps d'exécution
        #[arg(long)]
        time: bool,
    },

    /// Reconstruire un bundle depuis un répertoire de modules
    Pack {
        /// Répertoire des modules (`<id>.js`, `startup.js`)
        #[arg(short = 'o', long = "modules-dir", default_value = cli::DEFAULT_MODULES_DIR)]
        modules_dir: PathBuf,
        /// Bundle produit
        #[arg(short = 'n', long = "output", default_value = cli::DEFAULT_OUTPUT_BUNDLE)]
        output: PathBuf,
        /// Afficher le temps d'exécution
        #[arg(long)]
        time: bool,
    },

    /// Appliquer un répertoire de patchs à un bundle puis le reconstruire
    Patch {
        /// Bundle à lire
        #[arg(short = 'p', long = "bundle")]
        bundle: PathBuf,
        /// Répertoire des descripteurs (`*.json`, `*.txt`)
        #[arg(short = 'd', long = "patches")]
        patches_dir: PathBuf,
        /// Bundle produit
        #[arg(short = 'n', long = "output", default_value = cli::DEFAULT_OUTPUT_BUNDLE)]
        output: PathBuf,
        /// Afficher le temps d'exécution
        #[arg(long)]
        time: bool,
    },

    /// Afficher l'en-tête et la table d'entrées d'un bundle
    Inspect {
        /// Bundle à lire
        #[arg(short = 'p', long = "bundle")]
        bundle: PathBuf,
        /// Sortie JSON (pretty-printed) au lieu du tableau texte
        #[arg(long)]
        json: bool,
    },
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool) {
    #[cfg(feature = "trace")]
    {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        std::env::set_var(
            "RUST_LOG",
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
        );
        cli::init_logger();
        log::debug!("jsbundle {} (log level {level})", env!("CARGO_PKG_VERSION"));
    }
    #[cfg(not(feature = "trace"))]
    {
        let _ = (verbose, quiet);
    }
}

fn init_color(choice: ColorChoice) {
    // owo-colors détecte le TTY ; on force via les variables usuelles
    match choice {
        ColorChoice::Auto => {},
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        },
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        },
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> Result<()> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    use cli::{Command as C, InspectFormat, InspectTask, PackTask, PatchTask, UnpackTask};

    let command = match opt.cmd {
        Command::Unpack { bundle, output_dir, time } => {
            C::Unpack(UnpackTask { bundle, output_dir, time })
        },
        Command::Pack { modules_dir, output, time } => C::Pack(PackTask { modules_dir, output, time }),
        Command::Patch { bundle, patches_dir, output, time } => {
            C::Patch(PatchTask { bundle, patches_dir, output, time })
        },
        Command::Inspect { bundle, json } => {
            let format = if json { InspectFormat::Json } else { InspectFormat::Table };
            C::Inspect(InspectTask { bundle, format })
        },
    };

    let code = cli::execute(command).context("échec d'exécution de la commande")?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

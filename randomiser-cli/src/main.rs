use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::{Path, PathBuf};

use fe8_randomiser_core::patch::apply_package;
use fe8_randomiser_core::rom::Rom;
use fe8_randomiser_core::{run, RandomiserError, RandomiserSettings};

#[derive(Debug, Parser)]
#[command(
    name = "fe8-randomiser",
    version,
    about = "Fire Emblem: The Sacred Stones class randomiser"
)]
struct Args {
    /// Unmodified base ROM.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output directory, or the output ROM with --apply.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// JSON settings file; flags given on the command line win.
    #[arg(long, value_name = "JSON")]
    settings: Option<PathBuf>,

    /// Directory holding the catalog JSON documents.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON list of item placements handed over by the host.
    #[arg(long, value_name = "JSON")]
    placements: Option<PathBuf>,

    #[arg(long)]
    player_name: Option<String>,

    #[arg(long)]
    player_unit_rando: Option<bool>,

    #[arg(long)]
    player_unit_monsters: Option<bool>,

    #[arg(long)]
    super_demon_king: Option<bool>,

    #[arg(long)]
    smooth_level_caps: Option<bool>,

    #[arg(long)]
    min_endgame_level_cap: Option<u8>,

    #[arg(long)]
    required_holy_weapons: Option<u8>,

    #[arg(long)]
    exclude_latona: Option<bool>,

    #[arg(long)]
    easier_5x: Option<bool>,

    #[arg(long)]
    unbreakable_regalia: Option<bool>,

    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Apply a generated package to --input and write the ROM to --output.
    /// Randomisation is skipped when this is provided.
    #[arg(long, value_name = "PACKAGE")]
    apply: Option<PathBuf>,
}

fn settings_from_args(args: Args) -> Result<RandomiserSettings, RandomiserError> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(|source| RandomiserError::Catalog {
                file: path.display().to_string(),
                source,
            })?
        }
        None => RandomiserSettings::default(),
    };

    macro_rules! override_with {
        ($($field:ident),* $(,)?) => {
            $(if let Some(value) = args.$field {
                settings.$field = value;
            })*
        };
    }
    override_with!(
        seed,
        player_name,
        player_unit_rando,
        player_unit_monsters,
        super_demon_king,
        smooth_level_caps,
        min_endgame_level_cap,
        required_holy_weapons,
        exclude_latona,
        easier_5x,
        unbreakable_regalia,
        data_dir,
    );
    if let Some(input) = args.input {
        settings.input_path = input;
    }
    if let Some(output) = args.output {
        settings.output_path = output;
    }
    if args.placements.is_some() {
        settings.placements_path = args.placements;
    }
    settings.debug |= args.debug;
    Ok(settings)
}

fn apply(package: &Path, input: Option<&Path>, output: Option<&Path>) -> Result<(), RandomiserError> {
    let (Some(input), Some(output)) = (input, output) else {
        return Err(RandomiserError::Config(
            "--apply needs both --input and --output".to_string(),
        ));
    };
    let base = Rom::load(input)?;
    let bytes = std::fs::read(package)?;
    let rom = apply_package(&base, &bytes)?;
    std::fs::write(output, &rom.data)?;
    info!("wrote {}", output.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let result = match args.apply.clone() {
        Some(package) => apply(&package, args.input.as_deref(), args.output.as_deref()),
        None => settings_from_args(args).and_then(|settings| {
            if settings.input_path.as_os_str().is_empty() {
                return Err(RandomiserError::Config(
                    "--input is required (or input_path in --settings)".to_string(),
                ));
            }
            run(settings).map(|path| info!("package: {}", path.display()))
        }),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
